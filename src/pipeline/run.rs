//! Run records
//!
//! A [`PipelineRun`] is created when a trigger is admitted and written out
//! as a JSON report when the run ends. It is never reused.

use super::StepKind;
use crate::error::{NightshiftError, NightshiftResult};
use crate::platform::Platform;
use crate::release::PublishReport;
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not executed (disabled, other platform, or an earlier failure)
    Skipped,
    /// Failed without stopping the run
    Degraded,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub detail: String,
}

impl StepOutcome {
    fn new(kind: StepKind, status: StepStatus, detail: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            duration_ms: 0,
            detail: detail.into(),
        }
    }

    pub fn passed(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::new(kind, StepStatus::Passed, detail)
    }

    pub fn failed(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::new(kind, StepStatus::Failed, detail)
    }

    pub fn skipped(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::new(kind, StepStatus::Skipped, detail)
    }

    pub fn degraded(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::new(kind, StepStatus::Degraded, detail)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// How the dependency cache was used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheUsage {
    #[default]
    Disabled,
    /// Cache errored; full build
    Unavailable,
    Miss,
    Hit,
}

impl fmt::Display for CacheUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Miss => write!(f, "miss"),
            Self::Hit => write!(f, "hit"),
        }
    }
}

/// One pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub trigger: Trigger,
    pub platform: Platform,
    pub commit: String,
    pub toolchain_version: Option<Version>,
    pub cache_key: Option<String>,
    pub cache: CacheUsage,
    pub steps: Vec<StepOutcome>,
    pub release: Option<PublishReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error: Option<String>,
}

impl PipelineRun {
    /// Start a new run record
    pub fn start(trigger: Trigger, platform: Platform, commit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            platform,
            commit: commit.into(),
            toolchain_version: None,
            cache_key: None,
            cache: CacheUsage::default(),
            steps: vec![],
            release: None,
            started_at: Utc::now(),
            finished_at: None,
            success: false,
            error: None,
        }
    }

    /// Short id for display (first 8 chars)
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }

    /// Outcome of a step, if recorded
    pub fn step(&self, kind: StepKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Status of a step, if recorded
    pub fn status(&self, kind: StepKind) -> Option<StepStatus> {
        self.step(kind).map(|s| s.status)
    }

    /// Wall-clock duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Write the record as pretty JSON
    pub async fn write_report(&self, path: &Path) -> NightshiftResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| NightshiftError::io(format!("creating {}", parent.display()), e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| NightshiftError::io(format!("writing report {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_run_is_unfinished() {
        let run = PipelineRun::start(Trigger::Schedule, Platform::Linux, "abc123");
        assert!(!run.success);
        assert!(run.finished_at.is_none());
        assert!(run.steps.is_empty());
        assert_eq!(run.short_id().len(), 8);
    }

    #[test]
    fn runs_are_never_reused() {
        let a = PipelineRun::start(Trigger::Manual, Platform::Linux, "abc123");
        let b = PipelineRun::start(Trigger::Manual, Platform::Linux, "abc123");
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn report_is_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/run.json");
        let mut run = PipelineRun::start(
            Trigger::Push {
                branch: "main".to_string(),
            },
            Platform::Windows,
            "abc123",
        );
        run.toolchain_version = Some(Version::new(1, 82, 0));
        run.steps.push(StepOutcome::skipped(StepKind::Tag, "linux only"));

        run.write_report(&path).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["platform"], "windows");
        assert_eq!(parsed["trigger"]["event"], "push");
        assert_eq!(parsed["toolchain_version"], "1.82.0");
        assert_eq!(parsed["steps"][0]["kind"], "tag");
        assert_eq!(parsed["steps"][0]["status"], "skipped");
    }
}
