//! Recorder and writer configuration
//!
//! Recorder settings come from a JSON file; process level settings for the
//! replay binary come from environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

pub const MIN_BATCH_SIZE: usize = 100;
pub const MIN_WRITE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection and batching settings for one remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterConfig {
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    /// Maximum points per sink call
    #[serde(default)]
    pub batch_size: usize,
    #[serde(default)]
    pub write_interval_secs: u64,
}

impl WriterConfig {
    /// Raise batch size and write interval to their floors
    pub fn normalized(mut self) -> Self {
        if self.batch_size < MIN_BATCH_SIZE {
            self.batch_size = MIN_BATCH_SIZE;
        }
        if self.write_interval_secs < MIN_WRITE_INTERVAL.as_secs() {
            self.write_interval_secs = MIN_WRITE_INTERVAL.as_secs();
        }
        self
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_secs(self.write_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::InvalidValue("writer address cannot be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "writer database cannot be empty ({})",
                self.address
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Measurement name for every emitted point
    pub name: String,
    /// Strategy starting capital, used for net worth
    #[serde(default)]
    pub start_value: f64,
    /// Primary symbol → secondary symbol
    pub symbol_map: BTreeMap<String, String>,
    #[serde(default)]
    pub writers: Vec<WriterConfig>,
}

impl RecorderConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        log::info!(
            "📊 Loaded recorder config from {} ({} pairs, {} writers)",
            path.as_ref().display(),
            config.symbol_map.len(),
            config.writers.len()
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RecorderConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue("name cannot be empty".to_string()));
        }
        for writer in &self.writers {
            writer.validate()?;
        }
        Ok(())
    }
}

/// Process settings for the replay binary
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_path: String,
    pub snapshots_path: String,
    pub rust_log: String,
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    ///
    /// - `XYSTATS_CONFIG` (required): recorder config JSON file
    /// - `XYSTATS_SNAPSHOTS` (default: snapshots.jsonl)
    /// - `RUST_LOG` (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_path = lookup("XYSTATS_CONFIG")
            .ok_or_else(|| ConfigError::MissingVariable("XYSTATS_CONFIG".to_string()))?;

        let snapshots_path =
            lookup("XYSTATS_SNAPSHOTS").unwrap_or_else(|| "snapshots.jsonl".to_string());

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            config_path,
            snapshots_path,
            rust_log,
        })
    }
}
