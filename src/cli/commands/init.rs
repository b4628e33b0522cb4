//! Init command - create project-local nightshift.toml

use crate::cli::args::InitArgs;
use crate::config::LOCAL_CONFIG_NAME;
use crate::error::{NightshiftError, NightshiftResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for project-local config
const INIT_TEMPLATE: &str = r#"# nightshift project configuration
# Settings here override your global config (~/.config/nightshift/config.toml)

[project]
# name = "snake"
# binary = "snake"            # .exe is appended on Windows
# target_dir = "target"

[trigger]
# branch = "main"             # pushes here produce a nightly
# schedule = "0 0 1 * *"      # minute hour day-of-month * * (UTC)

[provision]
# channel = "stable"
# linux_packages = ["libxcb-render0-dev", "libxcb-shape0-dev", "libxcb-xfixes0-dev",
#                   "libxkbcommon-dev", "libssl-dev", "libgtk-3-dev"]

[build]
# command = ["cargo", "build", "--release"]
# test_command = ["cargo", "test", "--release"]

[cache]
# enabled = true
# manifests = ["Cargo.lock", "Cargo.toml"]
# paths = ["target"]

[release]
# tag = "nightly"
# repository = "owner/repo"   # default: $GITHUB_REPOSITORY or the origin remote
# token_env = "GITHUB_TOKEN"
# assets = []                 # default: the stripped binary
# tag_platform = "linux"
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> NightshiftResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| NightshiftError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(LOCAL_CONFIG_NAME);

    if config_path.exists() && !args.force {
        return Err(NightshiftError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| NightshiftError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );
    if !target_dir.join("Cargo.toml").exists() {
        ui::step_warn_hint(
            &ctx,
            "No Cargo.toml next to it",
            "nightshift expects to run from the game's workspace",
        );
    }

    Ok(())
}

async fn ensure_dir(dir: &Path) -> NightshiftResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| NightshiftError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}
