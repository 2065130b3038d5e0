// ============================================================
//  audio.rs — Lecture des alertes sonores via cpal
//
//  - Un flux de sortie unique, ouvert au démarrage, vivant
//    pendant toute la durée du processus
//  - play() relance le son depuis le début (fire-and-forget)
//  - Support : WASAPI (Windows), CoreAudio (macOS), ALSA (Linux)
// ============================================================

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AudioError;
use crate::tones;

pub const PREFERRED_RATE: u32 = 48_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    Alarm,
    #[default]
    Danger,
}

impl SoundId {
    pub const ALL: [SoundId; 2] = [SoundId::Alarm, SoundId::Danger];

    pub fn name(self) -> &'static str {
        match self {
            SoundId::Alarm => "alarm",
            SoundId::Danger => "danger",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SoundId::Alarm => SoundId::Danger,
            SoundId::Danger => SoundId::Alarm,
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Son prêt à jouer : échantillons déjà interleaved pour la sortie.
#[derive(Debug, Clone)]
pub struct SoundHandle {
    sound: SoundId,
    samples: Arc<Vec<f32>>,
}

impl SoundHandle {
    pub fn new(sound: SoundId, samples: Vec<f32>) -> Self {
        Self { sound, samples: Arc::new(samples) }
    }

    pub fn sound(&self) -> SoundId {
        self.sound
    }
}

/// Collaborateur audio du moniteur.
///
/// Les échecs de `play` sont journalisés par l'implémentation, jamais remontés.
pub trait AudioAlert {
    fn load(&mut self, sound: SoundId) -> Result<SoundHandle, AudioError>;
    fn play(&mut self, handle: &SoundHandle);
}

impl<A: AudioAlert + ?Sized> AudioAlert for Box<A> {
    fn load(&mut self, sound: SoundId) -> Result<SoundHandle, AudioError> {
        (**self).load(sound)
    }

    fn play(&mut self, handle: &SoundHandle) {
        (**self).play(handle)
    }
}

// ─── Sortie cpal ──────────────────────────────────────────────────────────────

struct Playback {
    buf: Arc<Vec<f32>>,
    pos: usize,
}

impl Playback {
    fn new() -> Self {
        Self {
            buf: Arc::new(Vec::new()),
            pos: 0,
        }
    }

    /// Remplace le son courant et repart du premier échantillon.
    fn restart(&mut self, handle: &SoundHandle) {
        self.buf = Arc::clone(&handle.samples);
        self.pos = 0;
    }

    /// Remplit un buffer de sortie, silence une fois le son terminé.
    fn fill<T: Sample + FromSample<f32>>(&mut self, out: &mut [T]) {
        let remaining = self.buf.len().saturating_sub(self.pos);
        let n = remaining.min(out.len());
        let src = &self.buf[self.pos..self.pos + n];
        for (dst, &s) in out[..n].iter_mut().zip(src) {
            *dst = T::from_sample(s);
        }
        out[n..].fill(T::EQUILIBRIUM);
        self.pos += n;
    }
}

pub struct CpalAlert {
    sample_rate: u32,
    channels: usize,
    device_name: String,
    playback: Arc<Mutex<Playback>>,
    _stream: cpal::Stream,
}

impl CpalAlert {
    /// Ouvre la sortie par défaut et démarre un flux silencieux.
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Inconnu".into());

        let (config, format) = find_output_config(&device, SampleRate(PREFERRED_RATE))?;
        let channels = config.channels as usize;

        let playback = Arc::new(Mutex::new(Playback::new()));
        let pb = Arc::clone(&playback);

        // Le son est synthétisé en f32 puis converti au format natif du périphérique
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, pb),
            SampleFormat::F64 => build_stream::<f64>(&device, &config, pb),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, pb),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, pb),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, pb),
            SampleFormat::U8 => build_stream::<u8>(&device, &config, pb),
            other => Err(AudioError::Config(format!("format non géré : {:?}", other))),
        }?;

        stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;

        log::info!(
            "Sortie audio : {} ({} canaux, {} Hz, {:?})",
            device_name,
            channels,
            config.sample_rate.0,
            format
        );

        Ok(Self {
            sample_rate: config.sample_rate.0,
            channels,
            device_name,
            playback,
            _stream: stream,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl AudioAlert for CpalAlert {
    fn load(&mut self, sound: SoundId) -> Result<SoundHandle, AudioError> {
        let mono = match sound {
            SoundId::Alarm => tones::generate_alarm(self.sample_rate),
            SoundId::Danger => tones::generate_danger(self.sample_rate),
        };
        log::debug!("Son chargé : {}", sound);
        Ok(SoundHandle::new(sound, tones::interleave(&mono, self.channels)))
    }

    fn play(&mut self, handle: &SoundHandle) {
        // Redémarre depuis le début, même si un son est en cours
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .restart(handle);
    }
}

// ─── Sortie absente ───────────────────────────────────────────────────────────

/// Remplaçant utilisé quand aucune sortie audio n'a pu être ouverte.
pub struct SilentAlert;

impl AudioAlert for SilentAlert {
    fn load(&mut self, _sound: SoundId) -> Result<SoundHandle, AudioError> {
        Err(AudioError::NoOutputDevice)
    }

    fn play(&mut self, handle: &SoundHandle) {
        log::debug!("Sortie muette : {} ignoré", handle.sound());
    }
}

/// Ouvre la sortie cpal, ou retombe sur [`SilentAlert`] en journalisant l'échec.
pub fn open_default() -> (Box<dyn AudioAlert>, String) {
    match CpalAlert::open() {
        Ok(alert) => {
            let name = alert.device_name().to_string();
            (Box::new(alert), name)
        }
        Err(e) => {
            log::warn!("Audio indisponible, alertes silencieuses : {}", e);
            (Box::new(SilentAlert), "Aucune".to_string())
        }
    }
}

// ─── Utilitaires internes ─────────────────────────────────────────────────────

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    playback: Arc<Mutex<Playback>>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32> + 'static,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                playback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .fill(data);
            },
            |e| log::error!("Erreur sortie audio : {}", e),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

/// Choix du format de sortie, par ordre de préférence :
///   1. F32 au taux souhaité
///   2. F32 au taux le plus proche
///   3. config par défaut du périphérique, dans son format natif (I16 sur ALSA hw:…)
fn find_output_config(
    device: &cpal::Device,
    desired_rate: SampleRate,
) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::Config(e.to_string()))?
        .filter(|conf| conf.sample_format() == SampleFormat::F32)
        .collect();

    let ranges: Vec<_> = supported
        .iter()
        .map(|conf| (conf.min_sample_rate().0, conf.max_sample_rate().0))
        .collect();

    if let Some((idx, rate)) = pick_rate(&ranges, desired_rate.0) {
        let conf = &supported[idx];
        return Ok((
            StreamConfig {
                channels: conf.channels(),
                sample_rate: SampleRate(rate),
                buffer_size: cpal::BufferSize::Default,
            },
            SampleFormat::F32,
        ));
    }

    let conf = device
        .default_output_config()
        .map_err(|e| AudioError::Config(e.to_string()))?;
    Ok((
        StreamConfig {
            channels: conf.channels(),
            sample_rate: conf.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        },
        conf.sample_format(),
    ))
}

/// Parmi des plages (min, max) de taux, retient celle qui contient `desired`,
/// sinon celle dont le taux borné est le plus proche.
fn pick_rate(ranges: &[(u32, u32)], desired: u32) -> Option<(usize, u32)> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, &(min, max))| (i, desired.clamp(min, max.max(min))))
        .min_by_key(|&(_, rate)| rate.abs_diff(desired))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_id_cycle() {
        assert_eq!(SoundId::Alarm.next(), SoundId::Danger);
        assert_eq!(SoundId::Danger.next(), SoundId::Alarm);
        assert_eq!(SoundId::default(), SoundId::Danger);
    }

    #[test]
    fn silent_alert_refuse_de_charger() {
        let mut alert = SilentAlert;
        assert!(matches!(
            alert.load(SoundId::Alarm),
            Err(AudioError::NoOutputDevice)
        ));
    }

    fn handle(samples: &[f32]) -> SoundHandle {
        SoundHandle::new(SoundId::Danger, samples.to_vec())
    }

    #[test]
    fn play_redemarre_depuis_le_debut() {
        let mut pb = Playback::new();
        pb.restart(&handle(&[0.1, 0.2, 0.3, 0.4, 0.5]));

        let mut out = [0.0f32; 2];
        pb.fill(&mut out);
        assert_eq!(out, [0.1, 0.2]);

        // Nouveau déclenchement alors que le son est en cours
        pb.restart(&handle(&[0.1, 0.2, 0.3, 0.4, 0.5]));
        let mut out = [0.0f32; 3];
        pb.fill(&mut out);
        assert_eq!(out, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn silence_apres_la_fin_du_son() {
        let mut pb = Playback::new();
        pb.restart(&handle(&[0.5, -0.5]));

        let mut out = [1.0f32; 5];
        pb.fill(&mut out);
        assert_eq!(out, [0.5, -0.5, 0.0, 0.0, 0.0]);

        let mut out = [1.0f32; 3];
        pb.fill(&mut out);
        assert_eq!(out, [0.0; 3]);
    }

    #[test]
    fn flux_silencieux_avant_toute_alerte() {
        let mut pb = Playback::new();
        let mut out = [7u16; 4];
        pb.fill(&mut out);
        // Silence non signé : milieu de plage
        assert_eq!(out, [u16::EQUILIBRIUM; 4]);
        assert_eq!(u16::EQUILIBRIUM, 32_768);
    }

    #[test]
    fn conversion_vers_format_entier() {
        let mut pb = Playback::new();
        pb.restart(&handle(&[0.0, 0.5, -0.5]));

        let mut out = [1i16; 4];
        pb.fill(&mut out);
        assert_eq!(out[0], 0);
        assert!(out[1] > 16_000 && out[1] < 16_500);
        assert!(out[2] < -16_000 && out[2] > -16_500);
        assert_eq!(out[3], 0);
    }

    #[test]
    fn choix_du_taux() {
        // Plage contenant le taux souhaité
        assert_eq!(pick_rate(&[(8_000, 22_050), (44_100, 96_000)], 48_000), Some((1, 48_000)));
        // Aucune plage ne le contient : taux borné le plus proche
        assert_eq!(pick_rate(&[(8_000, 22_050), (44_100, 44_100)], 48_000), Some((1, 44_100)));
        assert_eq!(pick_rate(&[(96_000, 192_000)], 48_000), Some((0, 96_000)));
        assert_eq!(pick_rate(&[], 48_000), None);
    }

    #[test]
    fn boite_delegue_au_collaborateur() {
        let mut boxed: Box<dyn AudioAlert> = Box::new(SilentAlert);
        assert!(boxed.load(SoundId::Danger).is_err());
    }
}
