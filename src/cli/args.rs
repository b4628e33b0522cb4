//! CLI argument definitions using clap derive

use crate::platform::Platform;
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// nightshift - nightly build-and-release pipeline
///
/// Provisions the toolchain, builds and tests the game, strips the binary,
/// moves the nightly tag and publishes the result to the nightly release.
#[derive(Parser, Debug)]
#[command(name = "nightshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NIGHTSHIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local nightshift.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Log line format (default: from config)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one pipeline instance for this platform
    Run(RunArgs),

    /// Show which steps a run would execute
    Plan(PlanArgs),

    /// Show the next scheduled run times
    Schedule(ScheduleArgs),

    /// Initialize a project-local nightshift.toml
    Init(InitArgs),

    /// Check toolchain, credentials and release state
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Manage the dependency cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Triggering event: push, schedule or manual
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "manual")]
    pub event: String,

    /// Branch that was pushed (push events)
    #[arg(long, env = "GITHUB_REF_NAME")]
    pub branch: Option<String>,

    /// Commit to build and tag (default: HEAD)
    #[arg(long, env = "GITHUB_SHA")]
    pub commit: Option<String>,

    /// Game workspace (defaults to current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Write the run record as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Disable the dependency cache for this run
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Platform to plan for (defaults to this host)
    #[arg(short, long)]
    pub platform: Option<Platform>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the schedule command
#[derive(Parser, Debug)]
pub struct ScheduleArgs {
    /// Number of fire times to show
    #[arg(short = 'n', long, default_value = "3")]
    pub count: usize,

    /// Start from this instant instead of now (RFC 3339)
    #[arg(long)]
    pub after: Option<DateTime<Utc>>,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing nightshift.toml
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., release.tag)
        key: String,
        /// Value to set; lists are comma-separated
        value: String,
        /// Write to project-local nightshift.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the cache key and state for a workspace
    Info {
        /// Game workspace (defaults to current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Remove entries older than the configured age
    Gc {
        /// Remove entries older than N days (default: from config)
        #[arg(long)]
        days: Option<u32>,

        /// Dry run - show what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove every cache entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
