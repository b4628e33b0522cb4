//! Whole-pipeline scenarios against scripted collaborators

use super::*;
use crate::process::scripted::ScriptedRunner;
use crate::release::memory::MemoryReleaseHost;
use crate::steps::fixtures::{Fixture, ELF, PE};

fn config() -> Config {
    Config::default()
}

async fn run(fixture: &Fixture, config: Config, platform: Platform, commit: &str) -> Execution {
    let mut ctx = fixture.context(config, platform, commit);
    Pipeline::standard()
        .execute(&mut ctx, Trigger::Schedule, &())
        .await
}

fn seeded_host(assets: &[(&str, u64)]) -> MemoryReleaseHost {
    let host = MemoryReleaseHost::new();
    host.seed_release("nightly", "Nightly", &config().release.body, assets);
    host
}

#[tokio::test]
async fn linux_success_tags_commit_and_replaces_asset() {
    let fixture = Fixture::with_host(ScriptedRunner::new(), seeded_host(&[("snake", 4)]));
    fixture.place_binary(Platform::Linux, ELF);

    let execution = run(&fixture, config(), Platform::Linux, "abc123").await;

    assert!(execution.run.success, "{:?}", execution.error);
    for outcome in &execution.run.steps {
        assert_eq!(outcome.status, StepStatus::Passed, "{}", outcome.kind);
    }

    let calls = fixture.runner.calls();
    assert!(calls.contains(&"git tag -fa nightly abc123 -m \"Nightly build\"".to_string()));
    assert!(calls.contains(&"git push --force origin nightly".to_string()));
    let strip = calls.iter().position(|c| c.starts_with("strip ")).unwrap();
    let tag = calls.iter().position(|c| c.starts_with("git tag")).unwrap();
    assert!(strip < tag);

    let release = fixture.host.release("nightly").unwrap();
    assert_eq!(release.assets.len(), 1);
    assert_eq!(release.asset("snake").unwrap().size, ELF.len() as u64);
    assert_eq!(execution.run.toolchain_version, Some(Version::new(1, 82, 0)));
    assert_eq!(
        execution.run.release.as_ref().unwrap().replaced,
        vec!["snake".to_string()]
    );
}

#[tokio::test]
async fn windows_test_failure_leaves_release_untouched() {
    let runner = ScriptedRunner::new().respond(
        "cargo test",
        101,
        &["test result: FAILED. 11 passed; 1 failed; 0 ignored"],
    );
    let fixture = Fixture::with_host(runner, seeded_host(&[("snake", 4), ("snake.exe", 9)]));
    fixture.place_binary(Platform::Windows, PE);
    let before = fixture.host.release("nightly").unwrap();

    let execution = run(&fixture, config(), Platform::Windows, "abc123").await;

    assert!(!execution.run.success);
    assert!(matches!(execution.error, Some(NightshiftError::TestFailed { .. })));
    assert_eq!(execution.run.status(StepKind::Test), Some(StepStatus::Failed));
    for kind in [
        StepKind::CacheSave,
        StepKind::Strip,
        StepKind::Tag,
        StepKind::Publish,
    ] {
        assert_eq!(execution.run.status(kind), Some(StepStatus::Skipped), "{}", kind);
    }

    let calls = fixture.runner.calls();
    assert!(!calls.iter().any(|c| c.starts_with("strip") || c.starts_with("git")));
    assert_eq!(fixture.host.release("nightly").unwrap(), before);
    assert!(fixture.host.uploads().is_empty());
}

#[tokio::test]
async fn windows_success_publishes_without_tagging() {
    let fixture = Fixture::with_host(ScriptedRunner::new(), seeded_host(&[("snake", 4)]));
    fixture.place_binary(Platform::Windows, PE);

    let execution = run(&fixture, config(), Platform::Windows, "abc123").await;

    assert!(execution.run.success);
    assert_eq!(execution.run.status(StepKind::Tag), Some(StepStatus::Skipped));
    assert!(!fixture.runner.calls().iter().any(|c| c.starts_with("git")));
    assert!(!fixture.runner.calls().iter().any(|c| c.contains("apt-get")));

    let release = fixture.host.release("nightly").unwrap();
    assert_eq!(release.asset("snake").unwrap().size, 4);
    assert_eq!(release.asset("snake.exe").unwrap().size, PE.len() as u64);
}

#[tokio::test]
async fn rerun_on_same_commit_converges() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.place_binary(Platform::Linux, ELF);

    let first = run(&fixture, config(), Platform::Linux, "abc123").await;
    let tags_after_first: Vec<_> = fixture
        .runner
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("git tag"))
        .collect();
    let second = run(&fixture, config(), Platform::Linux, "abc123").await;
    let tags: Vec<_> = fixture
        .runner
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("git tag"))
        .collect();

    assert!(first.run.success && second.run.success);
    assert_ne!(first.run.id, second.run.id);
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0], tags[1]);
    assert_eq!(tags_after_first.len(), 1);

    let release = fixture.host.release("nightly").unwrap();
    assert_eq!(release.assets.len(), 1);
    assert_eq!(fixture.host.created_commits().len(), 1);
}

#[tokio::test]
async fn unmatched_asset_fails_publish() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.place_binary(Platform::Linux, ELF);
    let mut config = config();
    config.release.assets = vec!["dist/snake-*.tar.gz".to_string()];

    let execution = run(&fixture, config, Platform::Linux, "abc123").await;

    assert!(!execution.run.success);
    assert_eq!(execution.run.status(StepKind::Publish), Some(StepStatus::Failed));
    assert!(matches!(
        execution.error,
        Some(NightshiftError::UnmatchedAsset { .. })
    ));
    assert!(fixture.host.uploads().is_empty());
}

#[tokio::test]
async fn broken_cache_does_not_fail_the_run() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.place_binary(Platform::Linux, ELF);
    std::fs::write(fixture.workspace().join("Cargo.lock"), "version = 3").unwrap();
    std::fs::write(fixture.cache_dir(), b"not a directory").unwrap();

    let execution = run(&fixture, config(), Platform::Linux, "abc123").await;

    assert!(execution.run.success);
    assert_eq!(
        execution.run.status(StepKind::CacheSave),
        Some(StepStatus::Degraded)
    );
    assert_eq!(execution.run.status(StepKind::Publish), Some(StepStatus::Passed));
}

#[tokio::test]
async fn disabled_steps_are_skipped() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.place_binary(Platform::Linux, ELF);
    let mut config = config();
    config.provision.enabled = false;
    config.cache.enabled = false;
    config.strip.enabled = false;

    let execution = run(&fixture, config, Platform::Linux, "abc123").await;

    assert!(execution.run.success);
    for kind in [
        StepKind::Provision,
        StepKind::CacheRestore,
        StepKind::CacheSave,
        StepKind::Strip,
    ] {
        assert_eq!(execution.run.status(kind), Some(StepStatus::Skipped), "{}", kind);
    }
    assert_eq!(execution.run.cache, CacheUsage::Disabled);
    assert!(execution.run.toolchain_version.is_none());
}
