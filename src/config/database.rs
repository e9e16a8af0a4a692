//! Embedded store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Location of the SQLite telemetry database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("agentwatch.db"),
        }
    }
}
