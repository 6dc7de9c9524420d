//! Configuration file
//!
//! A single JSON document. Every field except `collections` has a default.
//!
//! ```json
//! {
//!   "server": { "host": "0.0.0.0", "port": 8093 },
//!   "engine": { "channel_capacity": 1024, "batch_size": 1000, "stats_refresh_secs": 60 },
//!   "log_level": "info",
//!   "collections": [
//!     { "name": "beers", "documents": "./beers.json", "indexes": ["doc.abv"] }
//!   ]
//! }
//! ```
//!
//! Relative document paths resolve against the configuration file's
//! directory.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::plan::{PlannerOptions, DEFAULT_CHANNEL_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    AeroConfigInvalid,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::AeroConfigInvalid => "AERO_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::AeroConfigInvalid,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// trace, info, warn, error or fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows buffered between two operators
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Rows read from an access path per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between statistics refreshes, 0 disables the refresher
    #[serde(default = "default_stats_refresh_secs")]
    pub stats_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// JSON file holding the documents
    pub documents: PathBuf,
    /// Property paths to index, e.g. "doc.abv"
    #[serde(default)]
    pub indexes: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_batch_size() -> usize {
    1000
}

fn default_stats_refresh_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            batch_size: default_batch_size(),
            stats_refresh_secs: default_stats_refresh_secs(),
        }
    }
}

impl EngineConfig {
    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            channel_capacity: self.channel_capacity,
            batch_size: self.batch_size,
        }
    }

    pub fn stats_refresh_interval(&self) -> Option<Duration> {
        match self.stats_refresh_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Load and validate configuration from `path`
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            for collection in &mut config.collections {
                if collection.documents.is_relative() {
                    collection.documents = base.join(&collection.documents);
                }
            }
        }
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must be > 0"));
        }
        if self.engine.channel_capacity == 0 {
            return Err(ConfigError::invalid("engine.channel_capacity must be > 0"));
        }
        if self.engine.batch_size == 0 {
            return Err(ConfigError::invalid("engine.batch_size must be > 0"));
        }
        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::invalid(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if collection.name.is_empty() {
                return Err(ConfigError::invalid("collection name must not be empty"));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate collection '{}'",
                    collection.name
                )));
            }
            if collection.indexes.iter().any(|path| path.trim().is_empty()) {
                return Err(ConfigError::invalid(format!(
                    "collection '{}' has an empty index path",
                    collection.name
                )));
            }
        }

        Ok(())
    }

    /// The configured minimum log severity
    pub fn min_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}
