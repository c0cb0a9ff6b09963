//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// vote-herald: publish Portuguese parliament votes as Mastodon threads
#[derive(Parser, Debug)]
#[command(name = "vote-herald")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch votes and publish the new ones
    Run(RunArgs),

    /// Print rendered posts for the current feed without touching state
    Render(RenderArgs),

    /// Delete the account's recent statuses
    Prune(PruneArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run in dry-run mode (no actual publishing)
    #[arg(long)]
    pub dry_run: bool,

    /// Legislature to publish (overrides config)
    #[arg(long)]
    pub legislature: Option<String>,

    /// Path to the state file (overrides config)
    #[arg(long)]
    pub state_path: Option<PathBuf>,

    /// Write posts to an outbox file for review instead of publishing
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// Record every fetched vote as published without posting
    #[arg(long)]
    pub mark_all_as_published: bool,

    /// Record every unseen vote as skipped without posting
    #[arg(long)]
    pub skip_all: bool,

    /// Proceed even when there are more new votes than the safety limit
    #[arg(long)]
    pub override_too_many_new_votes: bool,

    /// With the override, skip new votes dated on or before this day (YYYY-MM-DD)
    #[arg(long)]
    pub cutoff_date: Option<String>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Legislature to render (overrides config)
    #[arg(long)]
    pub legislature: Option<String>,

    /// Render at most this many votes, newest first
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Delete statuses created in the last N hours
    #[arg(long, default_value_t = 1)]
    pub hours: i64,

    /// Actually delete; without it the statuses are only listed
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
