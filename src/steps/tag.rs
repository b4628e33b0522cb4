//! Floating tag
//!
//! Force-moves the annotated release tag to the run's commit and
//! force-pushes it. Only one platform's instance does this so the ref has a
//! single writer per commit.

use super::run_checked;
use crate::config::schema::Config;
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Step, StepContext, StepKind};
use crate::platform::Platform;
use crate::process::CommandSpec;
use async_trait::async_trait;
use tracing::info;

pub struct TagStep;

fn tag_error(command: String, output: String) -> NightshiftError {
    NightshiftError::Tag { command, output }
}

/// The git invocations that move `tag` to `commit`, in order
pub fn tag_commands(config: &Config, commit: &str) -> Vec<CommandSpec> {
    let git = &config.git;
    let tag = config.release.tag.as_str();
    vec![
        CommandSpec::new("git").args(["config", "user.name", git.user_name.as_str()]),
        CommandSpec::new("git").args(["config", "user.email", git.user_email.as_str()]),
        CommandSpec::new("git").args(["tag", "-fa", tag, commit, "-m", git.tag_message.as_str()]),
        CommandSpec::new("git").args(["push", "--force", git.remote.as_str(), tag]),
    ]
}

#[async_trait]
impl Step for TagStep {
    fn kind(&self) -> StepKind {
        StepKind::Tag
    }

    fn skip_reason(&self, config: &Config, platform: Platform) -> Option<String> {
        let tagger = config.release.tag_platform.as_str();
        (platform.id() != tagger).then(|| format!("tag is moved by the {} instance", tagger))
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        if ctx.commit.is_empty() {
            return Err(tag_error(
                "git tag".to_string(),
                "no commit to tag".to_string(),
            ));
        }

        for spec in tag_commands(&ctx.config, &ctx.commit) {
            run_checked(ctx, spec, tag_error).await?;
        }

        let tag = &ctx.config.release.tag;
        info!("Moved {} to {}", tag, ctx.commit);
        ctx.audit
            .log(
                "tag.moved",
                &serde_json::json!({
                    "tag": tag,
                    "commit": ctx.commit,
                    "remote": ctx.config.git.remote,
                    "platform": ctx.platform.id(),
                }),
            )
            .await;

        Ok(format!("{} -> {}", tag, ctx.commit))
    }
}
