//! CLI module for AgentWatch
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `watch` - Poll the telemetry database and print change batches
//! - `categories` - List watched categories and how changes are detected
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Watch with default config, JSON lines on stdout
//! agentwatch watch --json
//!
//! # Only events and alerts, polling every 500ms
//! agentwatch watch --category events --category security_alerts --interval-ms 500
//!
//! # Generate shell completions
//! agentwatch completions bash > ~/.bash_completion.d/agentwatch
//! ```

pub mod categories;
pub mod completions;
pub mod config;
pub mod output;
pub mod watch;

pub use categories::handle_categories;
pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::changes::EntityCategory;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// AgentWatch - change notifications for LLM-agent telemetry
#[derive(Parser, Debug)]
#[command(
    name = "agentwatch",
    version,
    about = "Change notifications for LLM-agent telemetry tables"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the telemetry database for changes
    Watch(WatchArgs),
    /// List watched categories
    Categories(CategoriesArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "agentwatch.toml")]
    pub config: PathBuf,

    /// Override database path
    #[arg(long, env = "AGENTWATCH_DB")]
    pub db: Option<PathBuf>,

    /// Override polling interval in milliseconds
    #[arg(short, long, env = "AGENTWATCH_POLL_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Watch only these categories (repeatable)
    #[arg(long = "category", value_parser = parse_category)]
    pub categories: Vec<EntityCategory>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "AGENTWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print batches as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Report rows that already exist on the first tick
    #[arg(long)]
    pub replay: bool,
}

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "agentwatch.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

fn parse_category(s: &str) -> Result<EntityCategory, String> {
    s.parse()
}
