// ============================================================
//  Alti Alert — Alarme d'altitude
//  Alerte sonore quand l'altitude franchit un seuil réglable
//
//  Dépendances :
//    cpal      — lecture audio cross-platform
//    ratatui   — interface TUI
//    crossterm — terminal cross-platform
//    clap/toml — ligne de commande & configuration
//    log       — journalisation (env_logger)
// ============================================================

mod app;
mod audio;
mod cli;
mod config;
mod error;
mod location;
mod monitor;
mod nmea;
mod tones;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::Cli;
use config::Config;
use std::{fs::File, path::Path};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(&cli).context("Chargement de la configuration")?;

    init_logging(cli.verbose, config.log_file.as_deref(), cli.headless)?;

    if cli.headless {
        App::run_headless(&config)
    } else {
        App::run(&config)
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>, headless: bool) -> Result<()> {
    logger_builder(verbose, log_file, headless)?.init();
    Ok(())
}

/// En mode TUI, sans fichier de journal, les logs sont coupés
/// pour ne pas écrire par-dessus l'écran alternatif. RUST_LOG
/// n'est pas lu dans ce cas : une directive par module passerait outre.
fn logger_builder(
    verbose: bool,
    log_file: Option<&Path>,
    headless: bool,
) -> Result<env_logger::Builder> {
    if log_file.is_none() && !headless {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Off);
        return Ok(builder);
    }

    let default_level = match (verbose, headless) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Impossible de créer {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.format_timestamp(None);
        }
    }

    Ok(builder)
}
