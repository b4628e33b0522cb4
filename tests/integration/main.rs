//! Integration tests for nightshift

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// The binary with CI event variables cleared and config isolated to `dir`
    fn nightshift(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("nightshift");
        cmd.current_dir(dir)
            .env("NIGHTSHIFT_CONFIG", dir.join("global.toml"))
            .env_remove("GITHUB_EVENT_NAME")
            .env_remove("GITHUB_REF_NAME")
            .env_remove("GITHUB_SHA");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("nightly build-and-release pipeline"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nightshift"));
    }

    #[test]
    fn config_path_honors_env() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("global.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[release]"))
            .stdout(predicate::str::contains("tag = \"nightly\""));
    }

    #[test]
    fn config_set_local_overrides_global() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["config", "set", "release.tag", "global-tag"])
            .assert()
            .success();
        nightshift(dir.path())
            .args(["config", "set", "release.tag", "edge", "--local"])
            .assert()
            .success();

        assert!(dir.path().join("nightshift.toml").exists());
        nightshift(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tag = \"edge\""));
        nightshift(dir.path())
            .args(["--no-local", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tag = \"global-tag\""));
    }

    #[test]
    fn config_set_unknown_key() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["config", "set", "release.colour", "blue"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn init_creates_then_refuses() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path()).arg("init").assert().success();
        assert!(dir.path().join("nightshift.toml").exists());

        nightshift(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
        nightshift(dir.path()).args(["init", "--force"]).assert().success();
    }

    #[test]
    fn plan_for_windows_skips_tag() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["plan", "--platform", "windows", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("build"))
            .stdout(predicate::str::contains("publish"))
            .stdout(predicate::str::contains("tag").not());
    }

    #[test]
    fn plan_json_lists_every_step() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["plan", "--platform", "linux", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"step\": \"tag\""))
            .stdout(predicate::str::contains("\"runs\": true"));
    }

    #[test]
    fn schedule_lists_first_of_month() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["schedule", "-n", "2", "--after", "2026-10-19T08:30:00Z"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2026-11-01 00:00 UTC"))
            .stdout(predicate::str::contains("2026-12-01 00:00 UTC"));
    }

    #[test]
    fn push_to_other_branch_is_not_eligible() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["run", "--event", "push", "--branch", "feature/tail"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not eligible"));
    }

    #[test]
    fn unknown_event_fails() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["run", "--event", "pull_request"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown trigger event"));
    }

    #[cfg(unix)]
    #[test]
    fn compile_failure_fails_the_run() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("nightshift.toml"),
            r#"
[general]
audit_log = false

[provision]
enabled = false

[cache]
enabled = false

[build]
command = ["sh", "-c", "echo 'error[E0425]: cannot find value'; exit 3"]
"#,
        )
        .unwrap();
        let report = dir.path().join("run.json");

        nightshift(dir.path())
            .args(["run", "--event", "schedule", "--commit", "abc123", "--report"])
            .arg(&report)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Compilation failed"));

        let record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(record["success"], false);
        assert_eq!(record["commit"], "abc123");
    }

    #[test]
    fn cache_list_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("nightshift.toml"),
            format!("[cache]\ndir = {:?}\n", dir.path().join("cache")),
        )
        .unwrap();

        nightshift(dir.path())
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries"));
    }

    #[test]
    fn completions_generate() {
        let dir = TempDir::new().unwrap();
        nightshift(dir.path())
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nightshift"));
    }
}
