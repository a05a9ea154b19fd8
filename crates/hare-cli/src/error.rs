//! Error handling for the hare CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Game error: {0}")]
    Game(#[from] hare_core::HareError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Console command error: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    pub fn command(reason: impl Into<String>) -> Self {
        Self::Command(reason.into())
    }
}
