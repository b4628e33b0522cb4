//! Release publishing step

use crate::error::NightshiftResult;
use crate::pipeline::{Step, StepContext, StepKind};
use crate::release::{publish, resolve_assets, ReleaseSpec};
use async_trait::async_trait;

pub struct PublishStep;

/// Asset patterns for a run; the built binary when none are configured
fn asset_patterns(ctx: &StepContext) -> Vec<String> {
    if ctx.config.release.assets.is_empty() {
        let binary = ctx.binary.clone().unwrap_or_else(|| ctx.expected_binary());
        vec![glob::Pattern::escape(&binary.to_string_lossy())]
    } else {
        ctx.config.release.assets.clone()
    }
}

#[async_trait]
impl Step for PublishStep {
    fn kind(&self) -> StepKind {
        StepKind::Publish
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let files = resolve_assets(&ctx.workspace, &asset_patterns(ctx))?;

        let config = &ctx.config.release;
        let spec = ReleaseSpec {
            tag: config.tag.clone(),
            title: config.title.clone(),
            body: config.body.clone(),
            commit: ctx.commit.clone(),
            prerelease: config.prerelease,
        };

        let report = publish(ctx.release.as_ref(), &spec, &files, &ctx.audit).await?;
        let detail = format!(
            "{} on {}{}",
            report.uploaded.join(", "),
            spec.tag,
            if report.replaced.is_empty() {
                String::new()
            } else {
                format!(" (replaced {})", report.replaced.join(", "))
            }
        );
        ctx.published = Some(report);
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Config;
    use crate::error::NightshiftError;
    use crate::platform::Platform;
    use crate::process::scripted::ScriptedRunner;
    use crate::release::memory::MemoryReleaseHost;
    use crate::steps::fixtures::{Fixture, ELF, PE};

    #[tokio::test]
    async fn publishes_binary_by_default() {
        let fixture = Fixture::new(ScriptedRunner::new());
        fixture.place_binary(Platform::Linux, ELF);
        let mut ctx = fixture.context(Config::default(), Platform::Linux, "abc123");

        let detail = PublishStep.execute(&mut ctx).await.unwrap();

        assert_eq!(detail, "snake on nightly");
        assert_eq!(fixture.host.uploads(), vec!["snake".to_string()]);
        assert_eq!(fixture.host.created_commits(), vec!["abc123".to_string()]);
        assert!(ctx.published.unwrap().created);
    }

    #[tokio::test]
    async fn platforms_share_one_release() {
        let host = MemoryReleaseHost::new();
        host.seed_release("nightly", "Nightly", &Config::default().release.body, &[("snake", 3)]);
        let fixture = Fixture::with_host(ScriptedRunner::new(), host);
        fixture.place_binary(Platform::Windows, PE);
        let mut ctx = fixture.context(Config::default(), Platform::Windows, "abc123");

        PublishStep.execute(&mut ctx).await.unwrap();

        let release = fixture.host.release("nightly").unwrap();
        let mut names: Vec<_> = release.assets.iter().map(|a| a.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["snake".to_string(), "snake.exe".to_string()]);
    }

    #[tokio::test]
    async fn unmatched_configured_pattern_fails() {
        let fixture = Fixture::new(ScriptedRunner::new());
        fixture.place_binary(Platform::Linux, ELF);
        let mut config = Config::default();
        config.release.assets = vec![
            "target/release/snake".to_string(),
            "assets/*.png".to_string(),
        ];
        let mut ctx = fixture.context(config, Platform::Linux, "abc123");

        let err = PublishStep.execute(&mut ctx).await.unwrap_err();

        assert!(matches!(err, NightshiftError::UnmatchedAsset { .. }));
        assert!(fixture.host.uploads().is_empty());
        assert!(fixture.host.release("nightly").is_none());
    }

    #[tokio::test]
    async fn upload_failure_is_fatal() {
        let fixture = Fixture::with_host(ScriptedRunner::new(), MemoryReleaseHost::failing_uploads());
        fixture.place_binary(Platform::Linux, ELF);
        let mut ctx = fixture.context(Config::default(), Platform::Linux, "abc123");

        let err = PublishStep.execute(&mut ctx).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.step(), Some(StepKind::Publish));
    }
}
