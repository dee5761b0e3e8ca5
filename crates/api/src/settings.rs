//! Service Configuration
//!
//! Layered with the `config` crate: compiled defaults, then an optional TOML
//! file, then `CARDIO__`-prefixed environment variables
//! (e.g. `CARDIO__DATABASE__URL=sqlite://cardio.db`).

use crate::rate_limit::RateLimitConfig;
use alerting::{AlertConfig, AlertError};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Invalid alerting configuration: {0}")]
    Alerting(#[from] AlertError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `memory` or a `sqlite:` URL
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "memory".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// `.json` forest or `.onnx` artifact
    pub path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: "models/risk_forest.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level service settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub model: ModelSettings,
    pub alerting: AlertConfig,
    pub logging: LoggingSettings,
    pub rate_limit: RateLimitConfig,
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from an optional file (extension may be omitted) and the environment
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse TOML text with no file or environment layers
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.alerting.validate()?;
        if self.database.max_connections == 0 {
            return Err(SettingsError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if !self.database.is_memory() && !self.database.url.starts_with("sqlite:") {
            return Err(SettingsError::Invalid(format!(
                "database.url must be \"memory\" or a sqlite: URL, got {:?}",
                self.database.url
            )));
        }
        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err(SettingsError::Invalid(
                "rate_limit.per_second and rate_limit.burst_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CARDIO")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
