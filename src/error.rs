// ============================================================
//  error.rs — Erreurs typées des collaborateurs
//
//  Aucune de ces erreurs n'est fatale dans la boucle de
//  surveillance : elles sont journalisées puis ignorées.
// ============================================================

use thiserror::Error;

/// Erreurs remontées par une source de position.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// Le récepteur répond mais n'a pas de fix.
    #[error("pas de fix GPS")]
    NoFix,

    /// Trame reçue mais illisible.
    #[error("trame invalide : {0}")]
    Parse(String),

    /// La source n'a pas pu être ouverte.
    #[error("source de position indisponible : {0}")]
    Unavailable(String),

    /// Fin du flux (EOF sur le fichier ou stdin).
    #[error("fin du flux de position")]
    Ended,
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("aucune sortie audio disponible")]
    NoOutputDevice,

    #[error("configuration de sortie audio introuvable : {0}")]
    Config(String),

    #[error("flux audio : {0}")]
    Stream(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("fichier de configuration introuvable : {0}")]
    FileNotFound(String),

    #[error("lecture de la configuration : {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration invalide : {0}")]
    Parse(#[from] toml::de::Error),
}
