// ============================================================
//  tones.rs — Synthèse des sons d'alerte
//
//  - Alarm  : sirène deux tons 880 / 660 Hz
//  - Danger : trois bips à 1 kHz
//  Enveloppe courte en attaque/relâchement pour éviter les clics.
// ============================================================

use std::f32::consts::PI;

pub const ALARM_DURATION: f32 = 1.5;
pub const ALARM_HIGH_HZ: f32 = 880.0;
pub const ALARM_LOW_HZ: f32 = 660.0;
pub const ALARM_HALF_PERIOD: f32 = 0.25;

pub const DANGER_HZ: f32 = 1_000.0;
pub const DANGER_BEEP: f32 = 0.15;
pub const DANGER_GAP: f32 = 0.10;
pub const DANGER_BEEPS: usize = 3;

const AMPLITUDE: f32 = 0.6;
const RAMP_SECS: f32 = 0.005;

// ─── Sirène deux tons ────────────────────────────────────────────────────────

pub fn generate_alarm(sample_rate: u32) -> Vec<f32> {
    let len = (ALARM_DURATION * sample_rate as f32) as usize;
    let mut buf = Vec::with_capacity(len);
    let mut phase = 0.0f32;

    for i in 0..len {
        let t = i as f32 / sample_rate as f32;
        let high = ((t / ALARM_HALF_PERIOD) as usize) % 2 == 0;
        let freq = if high { ALARM_HIGH_HZ } else { ALARM_LOW_HZ };
        // Phase continue : pas de discontinuité au changement de ton
        phase = (phase + 2.0 * PI * freq / sample_rate as f32) % (2.0 * PI);
        buf.push(phase.sin() * AMPLITUDE * envelope(t, ALARM_DURATION));
    }
    buf
}

// ─── Bips courts ─────────────────────────────────────────────────────────────

pub fn generate_danger(sample_rate: u32) -> Vec<f32> {
    let beep_len = (DANGER_BEEP * sample_rate as f32) as usize;
    let gap_len = (DANGER_GAP * sample_rate as f32) as usize;
    let mut buf = Vec::with_capacity(DANGER_BEEPS * (beep_len + gap_len));

    for n in 0..DANGER_BEEPS {
        for i in 0..beep_len {
            let t = i as f32 / sample_rate as f32;
            let s = (2.0 * PI * DANGER_HZ * t).sin();
            buf.push(s * AMPLITUDE * envelope(t, DANGER_BEEP));
        }
        if n + 1 < DANGER_BEEPS {
            buf.extend(std::iter::repeat(0.0).take(gap_len));
        }
    }
    buf
}

fn envelope(t: f32, duration: f32) -> f32 {
    (t / RAMP_SECS).min(1.0) * ((duration - t) / RAMP_SECS).clamp(0.0, 1.0)
}

/// Convertit un signal mono en buffer multicanal interleaved (même signal sur tous les canaux).
pub fn interleave(mono: &[f32], num_channels: usize) -> Vec<f32> {
    let num_channels = num_channels.max(1);
    let mut out = Vec::with_capacity(mono.len() * num_channels);
    for &s in mono {
        out.extend(std::iter::repeat(s).take(num_channels));
    }
    out
}
