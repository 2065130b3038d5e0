// ============================================================
//  config.rs — Configuration TOML
//
//  Priorité : arguments CLI > fichier > valeurs par défaut.
//  Chaque section est optionnelle (#[serde(default)]).
// ============================================================

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

use crate::{
    cli::Cli,
    error::ConfigError,
    location::SourceKind,
    monitor::{AlertConfig, ThresholdConfig},
};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Journal écrit dans ce fichier plutôt que sur stderr
    pub log_file: Option<PathBuf>,
    pub threshold: ThresholdConfig,
    pub alert: AlertConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Port série, fichier de trames, ou `-` pour stdin (source nmea)
    pub path: Option<PathBuf>,
    /// Pause entre deux lignes NMEA, en ms (0 = aucune)
    pub pace_ms: u64,
    /// Altitude de départ de la source simulée, en pieds
    pub start_ft: f64,
    /// Variation maximale entre deux mesures simulées, en pieds
    pub step_ft: f64,
    /// Intervalle entre deux mesures simulées, en ms
    pub interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Simulated,
            path: None,
            pace_ms: 0,
            start_ft: 1000.0,
            step_ft: 25.0,
            interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Premier fichier lisible parmi les emplacements par défaut.
    pub fn load_default() -> Option<Config> {
        for path in default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Configuration chargée depuis {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("{} ignoré : {}", path.display(), e),
            }
        }
        None
    }

    /// Charge le fichier (explicite ou par défaut) puis applique la CLI.
    pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::load_default().unwrap_or_default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(value) = cli.threshold {
            self.threshold.value = value;
        }
        if let Some(mode) = cli.mode {
            self.threshold.mode = mode.into();
        }
        if let Some(sound) = cli.sound {
            self.alert.sound = sound.into();
        }
        if cli.muted {
            self.alert.muted = true;
        }
        if let Some(kind) = cli.source {
            self.source.kind = kind.into();
        }
        if let Some(path) = &cli.nmea_path {
            self.source.path = Some(path.clone());
            // Un chemin NMEA n'a de sens qu'avec la source nmea
            if cli.source.is_none() {
                self.source.kind = SourceKind::Nmea;
            }
        }
        if let Some(path) = &cli.log_file {
            self.log_file = Some(path.clone());
        }
    }
}

pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        paths.push(home.join(".config/alti-alert/config.toml"));
    }

    paths.push(PathBuf::from("alti-alert.toml"));
    paths.push(PathBuf::from(".alti-alert.toml"));

    paths
}
