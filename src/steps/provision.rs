//! Toolchain provisioning
//!
//! Installs the configured Rust channel with rustup and, on Linux, the
//! native libraries the GUI stack links against.

use super::run_checked;
use crate::config::schema::Config;
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Step, StepContext, StepKind};
use crate::platform::Platform;
use crate::process::CommandSpec;
use async_trait::async_trait;
use semver::Version;
use tracing::info;

pub struct ProvisionStep;

fn provision_error(command: String, output: String) -> NightshiftError {
    NightshiftError::Provision {
        reason: format!("{}: {}", command, output),
    }
}

/// Extract the version from `rustc 1.82.0 (f6e511eec 2024-10-15)`
pub fn parse_rustc_version(output: &str) -> NightshiftResult<Version> {
    output
        .lines()
        .find_map(|line| {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some("rustc"), Some(version)) => Version::parse(version).ok(),
                _ => None,
            }
        })
        .ok_or_else(|| NightshiftError::ToolchainVersion(output.trim().to_string()))
}

fn apt(use_sudo: bool) -> CommandSpec {
    if use_sudo {
        CommandSpec::new("sudo").arg("apt-get")
    } else {
        CommandSpec::new("apt-get")
    }
}

#[async_trait]
impl Step for ProvisionStep {
    fn kind(&self) -> StepKind {
        StepKind::Provision
    }

    fn skip_reason(&self, config: &Config, _platform: Platform) -> Option<String> {
        (!config.provision.enabled).then(|| "provisioning disabled".to_string())
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let provision = ctx.config.provision.clone();

        if provision.install_toolchain {
            info!("Installing {} toolchain", provision.channel);
            let install = CommandSpec::new("rustup").args([
                "toolchain",
                "install",
                provision.channel.as_str(),
                "--profile",
                "minimal",
            ]);
            run_checked(ctx, install, provision_error).await?;

            let default = CommandSpec::new("rustup").args(["default", provision.channel.as_str()]);
            run_checked(ctx, default, provision_error).await?;
        }

        let mut packages = 0;
        if ctx.platform == Platform::Linux && !provision.linux_packages.is_empty() {
            info!("Installing {} system packages", provision.linux_packages.len());
            run_checked(ctx, apt(provision.use_sudo).arg("update"), provision_error).await?;

            let install = apt(provision.use_sudo)
                .args(["install", "-y"])
                .args(provision.linux_packages.iter().cloned());
            run_checked(ctx, install, provision_error).await?;
            packages = provision.linux_packages.len();
        }

        let output = run_checked(
            ctx,
            CommandSpec::new("rustc").arg("--version"),
            provision_error,
        )
        .await?;
        let version = parse_rustc_version(&output.text())?;
        ctx.toolchain_version = Some(version.clone());

        let mut detail = format!("rustc {} ({})", version, provision.channel);
        if packages > 0 {
            detail.push_str(&format!(", {} packages", packages));
        }
        Ok(detail)
    }
}
