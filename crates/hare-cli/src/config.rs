//! Hare CLI Configuration Management
//!
//! Configuration is layered with figment, later sources overriding earlier
//! ones:
//! - defaults
//! - `hare.toml` in the working directory
//! - `~/.hare/config.toml`
//! - environment variables (`HARE_GAME__DEBOUNCE_MS=500`)
//! - the file passed with `--config`

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hare_core::GameConfig;
use hare_runtime::{StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the hare CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Game rules and labels
    pub game: GameConfig,

    /// Session store selection
    pub store: StoreConfig,

    /// Console settings
    pub cli: CliConfig,
}

/// Console simulator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Prompt shown before each input line
    pub prompt: String,

    /// Print private messages; turn off when sharing a screen with players
    pub show_private: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            prompt: "hare> ".to_string(),
            show_private: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load and validate the layered configuration
    pub fn load(explicit: Option<&Path>, database: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("hare.toml"));
        if let Some(path) = Self::default_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("HARE_").split("__"));
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Loading(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = database {
            figment = figment
                .merge(("store.backend", StoreBackend::Sqlite))
                .merge(("store.path", path));
        }

        Self::extract(figment)
    }

    /// Load from a single file laid over the defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.hare/config.toml`, if a home directory is known
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".hare").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        self.store
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::FileSystem(format!("Failed to create config directory: {}", e))
            })?;
        }
        let toml_string = self.to_toml()?;
        std::fs::write(path.as_ref(), toml_string)
            .map_err(|e| ConfigError::FileSystem(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
