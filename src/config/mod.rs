//! Configuration module for AgentWatch
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`AGENTWATCH_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use agentwatch::config::AgentWatchConfig;
//!
//! // Load defaults
//! let config = AgentWatchConfig::default();
//! assert_eq!(config.polling.interval_ms, 2000);
//!
//! // Parse from TOML
//! let toml = r#"
//! [polling]
//! interval_ms = 500
//! "#;
//! let config: AgentWatchConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.polling.interval_ms, 500);
//! ```

pub mod database;
pub mod error;
pub mod logging;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};

// Re-export PollingConfig from changes module
pub use crate::changes::PollingConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted `polling.batch_size`.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Unified configuration for the watcher.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentWatchConfig {
    /// Embedded telemetry store
    pub database: DatabaseConfig,
    /// Change polling settings
    pub polling: PollingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AgentWatchConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports AGENTWATCH_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("AGENTWATCH_DB") {
            if !path.is_empty() {
                self.database.path = PathBuf::from(path);
            }
        }

        // Polling settings
        if let Ok(interval) = std::env::var("AGENTWATCH_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.polling.interval_ms = ms;
            }
        }
        if let Ok(batch) = std::env::var("AGENTWATCH_BATCH_SIZE") {
            if let Ok(n) = batch.parse() {
                self.polling.batch_size = n;
            }
        }

        // Logging settings
        if let Ok(level) = std::env::var("AGENTWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AGENTWATCH_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                field: "database.path".to_string(),
                message: "path cannot be empty".to_string(),
            });
        }

        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "polling.interval_ms".to_string(),
                message: "interval must be non-zero".to_string(),
            });
        }

        if self.polling.batch_size == 0 || self.polling.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Validation {
                field: "polling.batch_size".to_string(),
                message: format!("batch size must be between 1 and {}", MAX_BATCH_SIZE),
            });
        }

        if self.polling.categories.is_empty() {
            return Err(ConfigError::Validation {
                field: "polling.categories".to_string(),
                message: "at least one category must be watched".to_string(),
            });
        }

        self.logging.validate()
    }
}
