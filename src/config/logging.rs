//! Logging configuration

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Modules that accept a per-component level, as in `agentwatch::<component>`.
pub const COMPONENTS: [&str; 5] = ["changes", "cli", "config", "logging", "store"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, colored output for a terminal
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

/// Parsed from `AGENTWATCH_LOG_FORMAT`.
impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for every target (`off`, `error` .. `trace`)
    pub level: String,
    pub format: LogFormat,
    /// Per-module overrides, e.g. `changes = "debug"`; kept sorted so the
    /// rendered filter is stable
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub component_levels: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Reject levels `tracing` would not understand and components this crate does not have.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level("logging.level", &self.level)?;

        for (component, level) in &self.component_levels {
            let field = format!("logging.component_levels.{}", component);
            if !COMPONENTS.contains(&component.as_str()) {
                return Err(ConfigError::Validation {
                    field,
                    message: format!("unknown component, expected one of {}", COMPONENTS.join(", ")),
                });
            }
            parse_level(&field, level)?;
        }

        Ok(())
    }
}

fn parse_level(field: &str, level: &str) -> Result<LevelFilter, ConfigError> {
    level.parse::<LevelFilter>().map_err(|_| ConfigError::Validation {
        field: field.to_string(),
        message: format!("'{}' is not a log level", level),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.component_levels.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_component_levels_from_toml() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level = "warn"
            [component_levels]
            store = "debug"
            changes = "trace"
            "#,
        )
        .unwrap();
        assert_eq!(config.level, "warn");
        let components: Vec<&str> = config.component_levels.keys().map(String::as_str).collect();
        assert_eq!(components, vec!["changes", "store"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_validate_accepts_off_and_mixed_case() {
        let mut config = LoggingConfig {
            level: "OFF".to_string(),
            ..Default::default()
        };
        config
            .component_levels
            .insert("changes".to_string(), "Debug".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_component() {
        let mut config = LoggingConfig::default();
        config
            .component_levels
            .insert("routing".to_string(), "debug".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. })
                if field == "logging.component_levels.routing"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_component_level() {
        let mut config = LoggingConfig::default();
        config
            .component_levels
            .insert("store".to_string(), "loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_round_trips_through_display() {
        for format in [LogFormat::Pretty, LogFormat::Json] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str(" PRETTY ").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
        assert!(LogFormat::from_str("").is_err());
    }
}
