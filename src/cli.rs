// ============================================================
//  cli.rs — Arguments de la ligne de commande (clap derive)
//
//  Les valeurs passées ici priment sur le fichier de config.
// ============================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::{audio::SoundId, location::SourceKind, monitor::ThresholdMode};

/// Alarme d'altitude : alerte sonore au franchissement d'un seuil
#[derive(Parser, Debug, Default)]
#[command(name = "alti-alert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML
    #[arg(short, long, env = "ALTI_ALERT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seuil d'altitude en pieds
    #[arg(short, long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Sens du franchissement
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Son d'alerte
    #[arg(long, value_enum)]
    pub sound: Option<SoundArg>,

    /// Démarrer en mode muet
    #[arg(long)]
    pub muted: bool,

    /// Source de position
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Port série, fichier NMEA ou `-` pour stdin
    #[arg(long)]
    pub nmea_path: Option<PathBuf>,

    /// Sans interface : journalise chaque mesure sur stderr
    #[arg(long)]
    pub headless: bool,

    /// Fichier de journal (requis pour voir les logs en mode TUI)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Journalisation détaillée
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    #[value(alias = "over")]
    Above,
    Below,
}

impl From<ModeArg> for ThresholdMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Above => ThresholdMode::Above,
            ModeArg::Below => ThresholdMode::Below,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundArg {
    Alarm,
    Danger,
}

impl From<SoundArg> for SoundId {
    fn from(arg: SoundArg) -> Self {
        match arg {
            SoundArg::Alarm => SoundId::Alarm,
            SoundArg::Danger => SoundId::Danger,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Simulated,
    Nmea,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Simulated => SourceKind::Simulated,
            SourceArg::Nmea => SourceKind::Nmea,
        }
    }
}
