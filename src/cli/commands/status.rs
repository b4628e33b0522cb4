//! Status command - check toolchain, credentials and release state

use crate::cache::{format_bytes, CacheStore};
use crate::cli::commands::cache::local_store;
use crate::config::Config;
use crate::error::NightshiftResult;
use crate::platform::Platform;
use crate::process::{discard, CommandRunner, CommandSpec, SystemRunner};
use crate::release::github::{parse_github_remote, GithubReleaseHost};
use crate::release::ReleaseHost;
use crate::steps::provision::parse_rustc_version;
use crate::trigger::MonthlySchedule;
use crate::ui::{TaskSpinner, UiContext};
use chrono::Utc;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config) -> NightshiftResult<()> {
    println!("{}", style("nightshift status").bold().blue());
    println!();

    let runner = SystemRunner::new();
    let mut all_ok = true;

    println!("{}", style("Host:").bold());
    match Platform::detect() {
        Ok(platform) => {
            let role = if platform.id() == config.release.tag_platform {
                "builds, publishes and moves the tag"
            } else {
                "builds and publishes"
            };
            println!("  {}{} ({})", CHECK, platform.name(), role);
        }
        Err(e) => {
            println!("  {}{}", CROSS, e);
            all_ok = false;
        }
    }
    match UiContext::ci_provider() {
        Some(provider) => println!("  {}Running under {}", CHECK, provider),
        None => println!("  {}Not running in CI", WARN),
    }

    println!();
    println!("{}", style("Toolchain:").bold());
    all_ok &= check_tool(&runner, "rustc", &["--version"], "https://rustup.rs").await;
    all_ok &= check_tool(&runner, "cargo", &["--version"], "https://rustup.rs").await;
    if config.provision.enabled {
        check_tool(&runner, "rustup", &["--version"], "https://rustup.rs").await;
    }
    if config.strip.enabled {
        if let Some(program) = config.strip.command.first() {
            check_tool(&runner, program, &["--version"], "install binutils").await;
        }
    }
    all_ok &= check_tool(&runner, "git", &["--version"], "install git").await;

    println!();
    println!("{}", style("Release:").bold());
    let remote = git_remote(&runner, &config.git.remote).await;
    let host = GithubReleaseHost::from_config(&config.release).or_repository(remote);
    match host.repository() {
        Some(repo) => println!("  {}Repository: {}", CHECK, repo),
        None => {
            println!(
                "  {}{} - set release.repository or GITHUB_REPOSITORY",
                CROSS,
                style("No repository").red()
            );
            all_ok = false;
        }
    }
    if host.has_token() {
        println!("  {}Token found in ${}", CHECK, config.release.token_env);
        if host.repository().is_some() {
            check_release(&host, &config.release.tag).await;
        }
    } else {
        println!(
            "  {}{} - publishing will fail",
            WARN,
            style(format!("${} not set", config.release.token_env)).yellow()
        );
    }

    println!();
    println!("{}", style("Schedule:").bold());
    match config.trigger.schedule.parse::<MonthlySchedule>() {
        Ok(schedule) => println!(
            "  {}Next run {} (and on every push to {})",
            CHECK,
            schedule.next_after(Utc::now()).format("%Y-%m-%d %H:%M UTC"),
            config.trigger.branch
        ),
        Err(e) => {
            println!("  {}{}", CROSS, e);
            all_ok = false;
        }
    }

    println!();
    println!("{}", style("Cache:").bold());
    if config.cache.enabled {
        let store = local_store(config);
        match store.list().await {
            Ok(entries) => {
                let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
                println!(
                    "  {}{} entr(ies), {} in {}",
                    CHECK,
                    entries.len(),
                    format_bytes(total),
                    store.root().display()
                );
            }
            Err(e) => println!("  {}{} - runs will build from scratch", WARN, e),
        }
    } else {
        println!("  {}Disabled", WARN);
    }

    println!();
    if all_ok {
        println!("{}", style("All critical checks passed").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details").yellow().bold()
        );
    }

    Ok(())
}

/// Check a tool answers `--version`, printing the first line
async fn check_tool(runner: &SystemRunner, program: &str, args: &[&str], hint: &str) -> bool {
    let spec = CommandSpec::new(program).args(args.iter().copied());
    match runner.run(&spec, &discard).await {
        Ok(output) if output.success() => {
            let first = output.lines.first().cloned().unwrap_or_default();
            let version = if program == "rustc" {
                parse_rustc_version(&first)
                    .map(|v| v.to_string())
                    .unwrap_or(first)
            } else {
                first
            };
            println!("  {}{} {}", CHECK, program, style(version).dim());
            true
        }
        _ => {
            println!(
                "  {}{} - {}",
                CROSS,
                style(format!("{} not found", program)).red(),
                hint
            );
            false
        }
    }
}

async fn git_remote(runner: &SystemRunner, remote: &str) -> Option<String> {
    let spec = CommandSpec::new("git").args(["remote", "get-url", remote]);
    let output = runner.run(&spec, &discard).await.ok()?;
    if !output.success() {
        return None;
    }
    output.lines.first().and_then(|url| parse_github_remote(url))
}

async fn check_release(host: &GithubReleaseHost, tag: &str) {
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Fetching release {}...", tag));

    match host.find_release(tag).await {
        Ok(Some(release)) => {
            let assets: Vec<String> = release
                .assets
                .iter()
                .map(|a| format!("{} ({})", a.name, format_bytes(a.size)))
                .collect();
            spinner.stop(&format!(
                "{}: {}",
                release.tag,
                if assets.is_empty() {
                    "no assets".to_string()
                } else {
                    assets.join(", ")
                }
            ));
        }
        Ok(None) => spinner.stop_warn(&format!("{} does not exist yet", tag)),
        Err(e) => spinner.stop_warn(&format!("Could not fetch {}: {}", tag, e)),
    }
}
