//! Configuration management for the waymark CLI.
//!
//! TOML-based configuration with serde defaults and validation. Missing
//! files fall back to [`Config::default_config`].
//!
//! ```toml
//! [storage]
//! data_dir = "data/atlas"
//! legacy_file = "data/legacy_store.json"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the sled database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Flat-text legacy dump consulted once during migration.
    #[serde(default = "default_legacy_file")]
    pub legacy_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            legacy_file: default_legacy_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_dir() -> String {
    "data/atlas".to_string()
}

fn default_legacy_file() -> String {
    "data/legacy_store.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults, used when no config file exists.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Write a starter config file, refusing to overwrite an existing one.
    pub async fn create_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Err(anyhow!("config file already exists: {path}"));
        }
        let config = Self::default_config();
        let content = toml::to_string_pretty(&config)?;
        fs::write(path, content).await?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(anyhow!("unknown logging.level: {other}")),
        }
    }
}
