//! Error types for the sensor registry tools

use std::path::PathBuf;

use thiserror::Error;

use crate::syntax::SyntaxError;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry tool errors
///
/// Only fatal conditions live here. Unknown sensor types, unknown metric keys
/// and unmapped mnemonic keys are reported as findings, not errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Invalid mnemonic '{mnemonic}' for key '{key}': must be 1-5 uppercase letters or digits")]
    InvalidMnemonic { key: String, mnemonic: String },

    #[error("Invalid mnemonic table: {0}")]
    MnemonicTable(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    #[error("File walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
