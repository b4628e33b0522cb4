//! Pipeline execution
//!
//! A pipeline instance is an ordered list of steps folded fail-fast over a
//! shared [`StepContext`]: the first fatal error marks its step failed and
//! every later step skipped. Cache trouble degrades instead of failing.

pub mod run;
#[cfg(test)]
mod scenarios;

pub use run::{CacheUsage, PipelineRun, StepOutcome, StepStatus};

use crate::audit::AuditLog;
use crate::cache::{CacheKey, CacheStore};
use crate::config::schema::Config;
use crate::error::{NightshiftError, NightshiftResult};
use crate::platform::Platform;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::release::{PublishReport, ReleaseHost};
use crate::steps;
use crate::trigger::Trigger;
use async_trait::async_trait;
use chrono::Utc;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Provision,
    CacheRestore,
    Build,
    Test,
    CacheSave,
    Strip,
    Tag,
    Publish,
}

impl StepKind {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Provision => "Provision toolchain",
            Self::CacheRestore => "Restore cache",
            Self::Build => "Build",
            Self::Test => "Test",
            Self::CacheSave => "Save cache",
            Self::Strip => "Strip binary",
            Self::Tag => "Move tag",
            Self::Publish => "Publish release",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Self::Provision => "provision",
            Self::CacheRestore => "cache_restore",
            Self::Build => "build",
            Self::Test => "test",
            Self::CacheSave => "cache_save",
            Self::Strip => "strip",
            Self::Tag => "tag",
            Self::Publish => "publish",
        };
        write!(f, "{}", id)
    }
}

/// Everything a step can see and the state it hands to later steps
pub struct StepContext {
    pub config: Config,
    pub platform: Platform,
    pub workspace: PathBuf,
    pub commit: String,
    pub runner: Arc<dyn CommandRunner>,
    pub cache: Arc<dyn CacheStore>,
    pub release: Arc<dyn ReleaseHost>,
    pub audit: AuditLog,
    /// Receives every line of child process output
    pub output: Arc<dyn Fn(String) + Send + Sync>,

    pub toolchain_version: Option<Version>,
    pub cache_key: Option<CacheKey>,
    pub cache_usage: CacheUsage,
    pub binary: Option<PathBuf>,
    pub published: Option<PublishReport>,
}

impl StepContext {
    /// Create a context with no step state yet
    pub fn new(
        config: Config,
        platform: Platform,
        workspace: PathBuf,
        commit: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        cache: Arc<dyn CacheStore>,
        release: Arc<dyn ReleaseHost>,
    ) -> Self {
        Self {
            config,
            platform,
            workspace,
            commit: commit.into(),
            runner,
            cache,
            release,
            audit: AuditLog::disabled(),
            output: Arc::new(crate::process::discard),
            toolchain_version: None,
            cache_key: None,
            cache_usage: CacheUsage::Disabled,
            binary: None,
            published: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_output(mut self, output: Arc<dyn Fn(String) + Send + Sync>) -> Self {
        self.output = output;
        self
    }

    /// Run a command in the workspace, streaming output to the sink
    pub async fn exec(&self, spec: CommandSpec) -> NightshiftResult<CommandOutput> {
        let spec = if spec.cwd.is_none() {
            spec.current_dir(&self.workspace)
        } else {
            spec
        };
        self.runner.run(&spec, &*self.output).await
    }

    /// Cargo target directory for this workspace
    pub fn target_dir(&self) -> PathBuf {
        self.workspace.join(&self.config.project.target_dir)
    }

    /// Where the build leaves the executable
    pub fn expected_binary(&self) -> PathBuf {
        self.target_dir()
            .join("release")
            .join(self.platform.executable_name(&self.config.project.binary))
    }
}

/// One stage of the pipeline
#[async_trait]
pub trait Step: Send + Sync {
    fn kind(&self) -> StepKind;

    /// Reason this step does not apply to the configuration, if any
    fn skip_reason(&self, _config: &Config, _platform: Platform) -> Option<String> {
        None
    }

    /// Execute, returning a one-line detail for the run record
    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String>;
}

/// Receives step progress
pub trait StepObserver: Send + Sync {
    fn started(&self, _kind: StepKind) {}
    fn finished(&self, _outcome: &StepOutcome) {}
}

impl StepObserver for () {}

/// Result of executing a pipeline
#[derive(Debug)]
pub struct Execution {
    pub run: PipelineRun,
    /// The fatal error, when the run failed
    pub error: Option<NightshiftError>,
}

/// Ordered step list
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// Provision, cache restore, build, test, cache save, strip, tag, publish
    pub fn standard() -> Self {
        Self {
            steps: steps::standard(),
        }
    }

    pub fn from_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Steps with the reason each would be skipped
    pub fn plan(&self, config: &Config, platform: Platform) -> Vec<(StepKind, Option<String>)> {
        self.steps
            .iter()
            .map(|s| (s.kind(), s.skip_reason(config, platform)))
            .collect()
    }

    /// Fold the steps over `ctx`, stopping at the first fatal error
    pub async fn execute(
        &self,
        ctx: &mut StepContext,
        trigger: Trigger,
        observer: &dyn StepObserver,
    ) -> Execution {
        let mut run = PipelineRun::start(trigger, ctx.platform, ctx.commit.clone());
        let mut failure: Option<(StepKind, NightshiftError)> = None;
        info!(
            "Run {} started on {} at {}",
            run.short_id(),
            ctx.platform,
            ctx.commit
        );

        for step in &self.steps {
            let kind = step.kind();

            let outcome = if let Some((failed_at, _)) = &failure {
                StepOutcome::skipped(kind, format!("{} failed", failed_at))
            } else if let Some(reason) = step.skip_reason(&ctx.config, ctx.platform) {
                StepOutcome::skipped(kind, reason)
            } else {
                observer.started(kind);
                let started = Instant::now();
                let result = step.execute(ctx).await;
                let outcome = match result {
                    Ok(detail) => StepOutcome::passed(kind, detail),
                    Err(e) if !e.is_fatal() => {
                        warn!("{} degraded: {}", kind, e);
                        StepOutcome::degraded(kind, e.to_string())
                    }
                    Err(e) => {
                        error!("{} failed: {}", kind, e);
                        let outcome = StepOutcome::failed(kind, e.to_string());
                        failure = Some((kind, e));
                        outcome
                    }
                };
                outcome.with_duration(started.elapsed())
            };

            observer.finished(&outcome);
            run.steps.push(outcome);
        }

        run.toolchain_version = ctx.toolchain_version.clone();
        run.cache_key = ctx.cache_key.as_ref().map(CacheKey::as_string);
        run.cache = ctx.cache_usage;
        run.release = ctx.published.clone();
        run.finished_at = Some(Utc::now());
        let error = failure.map(|(_, e)| e);
        run.success = error.is_none();
        run.error = error.as_ref().map(ToString::to_string);

        info!(
            "Run {} {}",
            run.short_id(),
            if run.success { "succeeded" } else { "failed" }
        );

        Execution {
            run,
            error,
        }
    }
}
