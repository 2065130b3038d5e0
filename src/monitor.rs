// ============================================================
//  monitor.rs — Surveillance du seuil d'altitude
//
//  À chaque mesure : mise à jour de l'altitude, recalcul de
//  l'état de dépassement, puis alerte sonore si dépassé et
//  non muet. Aucun historique, aucune hystérésis : chaque
//  mesure en dépassement relance le son.
// ============================================================

use serde::Deserialize;
use std::fmt;
use std::time::SystemTime;

use crate::{
    audio::{AudioAlert, SoundHandle, SoundId},
    error::LocationError,
    location::Reading,
};

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    #[serde(alias = "over")]
    Above,
    #[default]
    Below,
}

impl ThresholdMode {
    pub fn toggled(self) -> Self {
        match self {
            ThresholdMode::Above => ThresholdMode::Below,
            ThresholdMode::Below => ThresholdMode::Above,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThresholdMode::Above => "au-dessus",
            ThresholdMode::Below => "en dessous",
        }
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub value: f64,
    pub mode: ThresholdMode,
}

impl ThresholdConfig {
    pub fn is_violated(&self, altitude_ft: f64) -> bool {
        match self.mode {
            ThresholdMode::Above => altitude_ft > self.value,
            ThresholdMode::Below => altitude_ft < self.value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub muted: bool,
    pub sound: SoundId,
}

/// État dérivé, recalculé à chaque mesure.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonitorState {
    pub current_altitude_ft: f64,
    pub threshold_violated: bool,
    pub last_reading_at: Option<SystemTime>,
}

// ─── Moniteur ─────────────────────────────────────────────────────────────────

pub struct AltitudeMonitor<A: AudioAlert> {
    audio: A,
    handle: Option<SoundHandle>,
    threshold: ThresholdConfig,
    alert: AlertConfig,
    state: MonitorState,
}

impl<A: AudioAlert> AltitudeMonitor<A> {
    /// Construit le moniteur et charge le son initial.
    pub fn new(audio: A, threshold: ThresholdConfig, alert: AlertConfig) -> Self {
        let mut monitor = Self {
            audio,
            handle: None,
            threshold,
            alert,
            state: MonitorState::default(),
        };
        monitor.reload_sound();
        monitor
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn threshold(&self) -> ThresholdConfig {
        self.threshold
    }

    pub fn alert(&self) -> AlertConfig {
        self.alert
    }

    /// Vrai si un son est chargé et prêt à jouer.
    pub fn sound_ready(&self) -> bool {
        self.handle.is_some()
    }

    pub fn on_reading(&mut self, reading: Reading) {
        self.state.current_altitude_ft = reading.altitude_ft;
        self.state.last_reading_at = Some(reading.at);
        self.state.threshold_violated = self.threshold.is_violated(reading.altitude_ft);

        log::debug!(
            "Altitude {:.1} ft (seuil {:.0} {}) → {}",
            reading.altitude_ft,
            self.threshold.value,
            self.threshold.mode,
            if self.state.threshold_violated { "DÉPASSÉ" } else { "ok" }
        );

        if self.state.threshold_violated && !self.alert.muted {
            match &self.handle {
                Some(handle) => self.audio.play(handle),
                None => log::debug!("Aucun son chargé, alerte ignorée"),
            }
        }
    }

    /// Lot de positions : seule la plus récente compte.
    pub fn on_update(&mut self, readings: &[Reading]) {
        if let Some(&last) = readings.last() {
            self.on_reading(last);
        }
    }

    pub fn on_location_error(&mut self, err: &LocationError) {
        log::warn!(
            "Position indisponible ({}), dernière altitude conservée : {:.0} ft",
            err,
            self.state.current_altitude_ft
        );
    }

    /// Remplace le seuil ; effectif à la prochaine mesure.
    pub fn set_threshold(&mut self, value: f64, mode: ThresholdMode) {
        self.threshold = ThresholdConfig { value, mode };
        log::info!("Seuil : {:.0} ft ({})", value, mode);
    }

    pub fn set_alert_config(&mut self, muted: bool, sound: SoundId) {
        let sound_changed = sound != self.alert.sound;
        self.alert = AlertConfig { muted, sound };
        log::info!("Alerte : son {}, muet {}", sound, muted);
        if sound_changed {
            self.reload_sound();
        }
    }

    pub fn set_threshold_value(&mut self, value: f64) {
        self.set_threshold(value, self.threshold.mode);
    }

    pub fn toggle_mode(&mut self) {
        self.set_threshold(self.threshold.value, self.threshold.mode.toggled());
    }

    pub fn toggle_mute(&mut self) {
        self.set_alert_config(!self.alert.muted, self.alert.sound);
    }

    pub fn cycle_sound(&mut self) {
        self.set_alert_config(self.alert.muted, self.alert.sound.next());
    }

    fn reload_sound(&mut self) {
        // L'ancien handle est invalide dès que le son change
        self.handle = None;
        match self.audio.load(self.alert.sound) {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => log::warn!("Impossible de charger le son {} : {}", self.alert.sound, e),
        }
    }
}

/// Saisie du seuil : nombre entier uniquement, sans espaces, sinon la valeur est ignorée.
pub fn parse_threshold_input(input: &str) -> Option<f64> {
    input.parse::<i64>().ok().map(|v| v as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(SoundId),
        Play(SoundId),
    }

    /// Collaborateur audio qui enregistre les appels.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_loads: Rc<RefCell<bool>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn plays(&self) -> Vec<SoundId> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Play(s) => Some(s),
                    Call::Load(_) => None,
                })
                .collect()
        }

        fn set_fail_loads(&self, fail: bool) {
            *self.fail_loads.borrow_mut() = fail;
        }
    }

    impl AudioAlert for Recorder {
        fn load(&mut self, sound: SoundId) -> Result<SoundHandle, AudioError> {
            self.calls.borrow_mut().push(Call::Load(sound));
            if *self.fail_loads.borrow() {
                return Err(AudioError::NoOutputDevice);
            }
            Ok(SoundHandle::new(sound, Vec::new()))
        }

        fn play(&mut self, handle: &SoundHandle) {
            self.calls.borrow_mut().push(Call::Play(handle.sound()));
        }
    }

    fn monitor(
        value: f64,
        mode: ThresholdMode,
        muted: bool,
    ) -> (AltitudeMonitor<Recorder>, Recorder) {
        let rec = Recorder::default();
        let m = AltitudeMonitor::new(
            rec.clone(),
            ThresholdConfig { value, mode },
            AlertConfig {
                muted,
                sound: SoundId::Danger,
            },
        );
        (m, rec)
    }

    #[test]
    fn en_dessous_du_seuil_declenche_danger() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.on_reading(Reading::new(900.0));
        assert!(m.state().threshold_violated);
        assert_eq!(m.state().current_altitude_ft, 900.0);
        assert_eq!(rec.plays(), vec![SoundId::Danger]);
    }

    #[test]
    fn au_dessus_non_depasse_ne_joue_rien() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Above, false);
        m.on_reading(Reading::new(900.0));
        assert!(!m.state().threshold_violated);
        assert!(rec.plays().is_empty());
    }

    #[test]
    fn muet_calcule_le_depassement_sans_jouer() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, true);
        m.on_reading(Reading::new(500.0));
        assert!(m.state().threshold_violated);
        assert!(rec.plays().is_empty());
    }

    #[test]
    fn depassement_suit_la_formule_pour_tout_mode() {
        let altitudes = [-500.0, 0.0, 999.9, 1000.0, 1000.1, 30_000.0];
        for &t in &[-100.0, 0.0, 1000.0] {
            for &alt in &altitudes {
                let (mut below, _) = monitor(t, ThresholdMode::Below, true);
                below.on_reading(Reading::new(alt));
                assert_eq!(below.state().threshold_violated, alt < t, "below {} {}", alt, t);

                let (mut above, _) = monitor(t, ThresholdMode::Above, true);
                above.on_reading(Reading::new(alt));
                assert_eq!(above.state().threshold_violated, alt > t, "above {} {}", alt, t);
            }
        }
    }

    #[test]
    fn egalite_ne_depasse_jamais() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.on_reading(Reading::new(1000.0));
        assert!(!m.state().threshold_violated);
        m.toggle_mode();
        m.on_reading(Reading::new(1000.0));
        assert!(!m.state().threshold_violated);
        assert!(rec.plays().is_empty());
    }

    #[test]
    fn chaque_mesure_en_depassement_relance_le_son() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        for alt in [900.0, 800.0, 700.0] {
            m.on_reading(Reading::new(alt));
        }
        assert_eq!(rec.plays().len(), 3);
    }

    #[test]
    fn changement_de_son_recharge_avant_lecture() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.set_alert_config(false, SoundId::Alarm);
        m.on_reading(Reading::new(10.0));
        assert_eq!(
            rec.calls(),
            vec![
                Call::Load(SoundId::Danger),
                Call::Load(SoundId::Alarm),
                Call::Play(SoundId::Alarm),
            ]
        );
    }

    #[test]
    fn meme_son_ne_recharge_pas() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.toggle_mute();
        m.toggle_mute();
        assert_eq!(rec.calls(), vec![Call::Load(SoundId::Danger)]);
        assert!(!m.alert().muted);
    }

    #[test]
    fn echec_de_chargement_rend_play_inoperant_jusqua_rechargement() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        rec.set_fail_loads(true);
        m.cycle_sound();
        assert!(!m.sound_ready());
        m.on_reading(Reading::new(10.0));
        assert!(rec.plays().is_empty());

        rec.set_fail_loads(false);
        m.cycle_sound();
        assert!(m.sound_ready());
        m.on_reading(Reading::new(10.0));
        assert_eq!(rec.plays(), vec![SoundId::Danger]);
    }

    #[test]
    fn nouveau_seuil_effectif_a_la_mesure_suivante() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.on_reading(Reading::new(900.0));
        m.set_threshold(500.0, ThresholdMode::Below);
        // L'état courant n'est pas réévalué
        assert!(m.state().threshold_violated);
        m.on_reading(Reading::new(900.0));
        assert!(!m.state().threshold_violated);
        assert_eq!(rec.plays().len(), 1);
    }

    #[test]
    fn erreur_de_position_conserve_l_etat() {
        let (mut m, _) = monitor(1000.0, ThresholdMode::Below, false);
        m.on_reading(Reading::new(900.0));
        let before = m.state();
        m.on_location_error(&LocationError::NoFix);
        assert_eq!(m.state(), before);
    }

    #[test]
    fn lot_de_positions_garde_la_plus_recente() {
        let (mut m, rec) = monitor(1000.0, ThresholdMode::Below, false);
        m.on_update(&[Reading::new(500.0), Reading::new(1500.0)]);
        assert_eq!(m.state().current_altitude_ft, 1500.0);
        assert!(!m.state().threshold_violated);
        assert!(rec.plays().is_empty());

        m.on_update(&[]);
        assert_eq!(m.state().current_altitude_ft, 1500.0);
    }

    #[test]
    fn saisie_du_seuil() {
        assert_eq!(parse_threshold_input("1000"), Some(1000.0));
        assert_eq!(parse_threshold_input("-250"), Some(-250.0));
        assert_eq!(parse_threshold_input(" 5"), None);
        assert_eq!(parse_threshold_input("5 "), None);
        assert_eq!(parse_threshold_input("+12"), Some(12.0));
        assert_eq!(parse_threshold_input("12.5"), None);
        assert_eq!(parse_threshold_input(""), None);
        assert_eq!(parse_threshold_input("-"), None);
        assert_eq!(parse_threshold_input("abc"), None);
    }

    #[test]
    fn mode_accepte_l_alias_over() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: ThresholdMode,
        }
        let w: Wrap = toml::from_str("mode = \"over\"").unwrap();
        assert_eq!(w.mode, ThresholdMode::Above);
        let w: Wrap = toml::from_str("mode = \"below\"").unwrap();
        assert_eq!(w.mode, ThresholdMode::Below);
    }
}
