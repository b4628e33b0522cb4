//! nightshift - nightly build-and-release pipeline
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use nightshift::cli::args::LogFormat;
use nightshift::cli::{Cli, Commands};
use nightshift::config::{Config, ConfigManager};
use nightshift::error::{NightshiftError, NightshiftResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> NightshiftResult<()> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config
    match cli.command {
        Commands::Completions { shell } => {
            nightshift::cli::commands::completions(shell);
            return Ok(());
        }
        Commands::Init(args) => {
            init_logging(cli.verbose, cli.log_format.unwrap_or(LogFormat::Text));
            return nightshift::cli::commands::init(args).await;
        }
        _ => {}
    }

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| NightshiftError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, log_format(cli.log_format, &config));
    match local_config_path {
        Some(ref path) => debug!("Using local config: {}", path.display()),
        None if cli.no_local => debug!("Local config discovery disabled (--no-local)"),
        None => {}
    }

    ConfigManager::ensure_state_dirs().await?;
    nightshift::ui::init_theme();

    match cli.command {
        Commands::Completions { .. } | Commands::Init(_) => Ok(()),
        Commands::Run(args) => nightshift::cli::commands::run(args, &config).await,
        Commands::Plan(args) => nightshift::cli::commands::plan(args, &config).await,
        Commands::Schedule(args) => nightshift::cli::commands::schedule(args, &config).await,
        Commands::Status => nightshift::cli::commands::status(&config).await,
        Commands::Config(args) => {
            nightshift::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Cache(args) => nightshift::cli::commands::cache(args, &config).await,
    }
}

/// `--log-format` wins over `general.log_format`
fn log_format(flag: Option<LogFormat>, config: &Config) -> LogFormat {
    flag.unwrap_or(if config.general.log_format == "json" {
        LogFormat::Json
    } else {
        LogFormat::Text
    })
}

/// 0 = warn (step output only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::new("nightshift=warn"),
        1 => EnvFilter::new("nightshift=info"),
        _ => EnvFilter::new("nightshift=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_target(false).without_time().init(),
    }
}
