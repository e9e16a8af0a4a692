//! Watch command implementation

use crate::changes::{ChangeService, Channel, ConnectionStatus};
use crate::cli::{output, WatchArgs};
use crate::config::{AgentWatchConfig, ConfigError};
use crate::logging::init_tracing;
use crate::store::SqliteExecutor;
use anyhow::Context;
use std::sync::Arc;

/// Load configuration with CLI overrides applied
pub fn load_config_with_overrides(args: &WatchArgs) -> Result<AgentWatchConfig, ConfigError> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        AgentWatchConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        AgentWatchConfig::default()
    };

    config = config.with_env_overrides();

    // CLI overrides (highest priority)
    if let Some(ref db) = args.db {
        config.database.path = db.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.polling.interval_ms = ms;
    }
    if !args.categories.is_empty() {
        config.polling.categories = args.categories.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.replay {
        config.polling.prime_on_start = false;
    }

    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Main watch command handler
pub async fn run_watch(args: WatchArgs) -> anyhow::Result<()> {
    // 1. Load and validate config
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging).map_err(|e| anyhow::anyhow!("{}", e))?;

    if !config.polling.enabled {
        anyhow::bail!("Polling is disabled in configuration ([polling].enabled = false)");
    }

    // 3. Open the store
    let db_path = &config.database.path;
    if !db_path.exists() {
        anyhow::bail!("Database not found: {}", db_path.display());
    }
    let executor = SqliteExecutor::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    // 4. Wire subscribers
    let service = ChangeService::new(Arc::new(executor), &config.polling);
    let json = args.json;
    service.subscribe(Channel::All, move |batch| {
        if json {
            match output::format_batch_json(batch) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize batch"),
            }
        } else {
            println!("{}", output::format_batch_line(batch));
        }
    });
    service.subscribe_connectivity(|status: ConnectionStatus| {
        eprintln!("{}", output::format_status(status));
    });

    // 5. Poll until signalled
    tracing::info!(
        db = %db_path.display(),
        categories = ?service.categories(),
        "AgentWatch starting"
    );
    service.start()?;
    shutdown_signal().await;

    // 6. Cleanup
    service.shutdown();
    tracing::info!("AgentWatch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::EntityCategory;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn args(config: PathBuf) -> WatchArgs {
        WatchArgs {
            config,
            db: None,
            interval_ms: None,
            categories: Vec::new(),
            log_level: None,
            json: false,
            replay: false,
        }
    }

    #[test]
    fn test_watch_config_loading() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            "[polling]\ncategories = [\"events\"]\nprime_on_start = false",
        )
        .unwrap();

        let config = load_config_with_overrides(&args(temp.path().to_path_buf())).unwrap();
        assert_eq!(config.polling.categories, vec![EntityCategory::Events]);
        assert!(!config.polling.prime_on_start);
    }

    #[test]
    fn test_watch_cli_overrides_config() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[polling]\ncategories = [\"events\"]").unwrap();

        let mut watch = args(temp.path().to_path_buf());
        watch.db = Some(PathBuf::from("/tmp/override.db"));
        watch.interval_ms = Some(300);
        watch.categories = vec![EntityCategory::SecurityAlerts];
        watch.log_level = Some("trace".to_string());

        let config = load_config_with_overrides(&watch).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.polling.interval_ms, 300);
        assert_eq!(config.polling.categories, vec![EntityCategory::SecurityAlerts]);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_watch_works_without_config_file() {
        let config =
            load_config_with_overrides(&args(PathBuf::from("nonexistent-agentwatch.toml")))
                .unwrap();
        assert_eq!(config.polling.categories.len(), 6);
        assert!(config.polling.prime_on_start);
    }

    #[test]
    fn test_watch_replay_disables_priming() {
        let mut watch = args(PathBuf::from("nonexistent-agentwatch.toml"));
        watch.replay = true;
        let config = load_config_with_overrides(&watch).unwrap();
        assert!(!config.polling.prime_on_start);
    }

    #[test]
    fn test_watch_malformed_config_is_an_error() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[polling\n").unwrap();
        let result = load_config_with_overrides(&args(temp.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
