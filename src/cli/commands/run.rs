//! Run command - execute one pipeline instance

use crate::audit::AuditLog;
use crate::cache::LocalCacheStore;
use crate::cli::args::RunArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Pipeline, StepContext, StepKind, StepObserver, StepOutcome};
use crate::platform::Platform;
use crate::process::{discard, CommandRunner, CommandSpec, SystemRunner};
use crate::release::github::{parse_github_remote, GithubReleaseHost};
use crate::trigger::Trigger;
use crate::ui::{self, StepProgress, UiContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> NightshiftResult<()> {
    let ctx = UiContext::detect();

    let trigger = Trigger::from_event(&args.event, args.branch.as_deref())?;
    if !trigger.is_eligible(&config.trigger) {
        info!("Ignoring {}", trigger);
        ui::step_info(
            &ctx,
            &format!(
                "{} is not eligible for a nightly (only pushes to {} are)",
                trigger, config.trigger.branch
            ),
        );
        return Ok(());
    }

    let platform = Platform::detect()?;
    let workspace = resolve_workspace(args.workspace)?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());

    let commit = match args.commit.filter(|c| !c.trim().is_empty()) {
        Some(commit) => commit,
        None => resolve_head(&*runner, &workspace).await?,
    };

    let mut config = config.clone();
    if args.no_cache {
        config.cache.enabled = false;
    }

    let remote = origin_repository(&*runner, &workspace, &config.git.remote).await;
    let host = GithubReleaseHost::from_config(&config.release).or_repository(remote);
    let store = LocalCacheStore::new(
        config
            .cache
            .dir
            .clone()
            .unwrap_or_else(ConfigManager::cache_dir),
    );
    let audit = AuditLog::new(&config);

    ui::intro(
        &ctx,
        &format!("nightshift {} for {}", config.release.tag, platform.name()),
    );
    ui::key_value(&ctx, "Trigger", &trigger.to_string());
    ui::key_value(&ctx, "Commit", &commit);
    ui::key_value(&ctx, "Workspace", &workspace.display().to_string());
    ui::key_value(
        &ctx,
        "Repository",
        host.repository().unwrap_or("(not configured)"),
    );

    let progress = Arc::new(StepProgress::new(&ctx));
    let sink = Arc::clone(&progress);
    let mut step_ctx = StepContext::new(
        config,
        platform,
        workspace,
        commit,
        runner,
        Arc::new(store),
        Arc::new(host),
    )
    .with_audit(audit)
    .with_output(Arc::new(move |line| sink.on_line(line)));

    let display = RunDisplay {
        ui: ctx.clone(),
        progress,
    };
    let execution = Pipeline::standard()
        .execute(&mut step_ctx, trigger, &display)
        .await;

    if let Some(path) = args.report {
        execution.run.write_report(&path).await?;
        ui::remark(&ctx, &format!("Run report written to {}", path.display()));
    }

    let elapsed = execution
        .run
        .duration()
        .map(|d| format!(" in {}s", d.num_seconds()))
        .unwrap_or_default();

    match execution.error {
        None => {
            ui::outro_success(
                &ctx,
                &format!("Run {} succeeded{}", execution.run.short_id(), elapsed),
            );
            Ok(())
        }
        Some(e) => {
            ui::outro_error(
                &ctx,
                &format!("Run {} failed{}", execution.run.short_id(), elapsed),
            );
            Err(e)
        }
    }
}

/// Renders step progress as the pipeline advances
struct RunDisplay {
    ui: UiContext,
    progress: Arc<StepProgress>,
}

impl StepObserver for RunDisplay {
    fn started(&self, kind: StepKind) {
        self.progress.begin(kind.label());
    }

    fn finished(&self, outcome: &StepOutcome) {
        self.progress.end();
        ui::step_outcome(&self.ui, outcome);
    }
}

/// Canonical workspace path, defaulting to the current directory
pub(crate) fn resolve_workspace(workspace: Option<PathBuf>) -> NightshiftResult<PathBuf> {
    match workspace {
        Some(path) => {
            if !path.is_dir() {
                return Err(NightshiftError::PathNotFound(path));
            }
            Ok(path.canonicalize().unwrap_or(path))
        }
        None => std::env::current_dir()
            .map_err(|e| NightshiftError::io("getting current directory", e)),
    }
}

/// Commit checked out in `workspace`
async fn resolve_head(runner: &dyn CommandRunner, workspace: &Path) -> NightshiftResult<String> {
    let spec = CommandSpec::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(workspace);
    let output = runner.run(&spec, &discard).await?;

    let commit = output
        .lines
        .first()
        .map(|line| line.trim().to_string())
        .filter(|line| output.success() && !line.is_empty());

    match commit {
        Some(commit) => {
            debug!("Resolved HEAD to {}", commit);
            Ok(commit)
        }
        None => Err(NightshiftError::command_exec(spec.to_string(), output.tail())),
    }
}

/// `owner/repo` of the tag remote, when it points at GitHub
async fn origin_repository(
    runner: &dyn CommandRunner,
    workspace: &Path,
    remote: &str,
) -> Option<String> {
    let spec = CommandSpec::new("git")
        .args(["remote", "get-url", remote])
        .current_dir(workspace);
    let output = runner.run(&spec, &discard).await.ok()?;
    if !output.success() {
        return None;
    }
    output.lines.first().and_then(|url| parse_github_remote(url))
}
