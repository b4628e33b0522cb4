//! Pipeline steps
//!
//! Each collaborator (toolchain, cache, compiler, test runner, stripper,
//! VCS, release host) sits behind one step. Steps talk to the outside world
//! only through the context's runner, cache store and release host.

pub mod build;
pub mod cache;
pub mod provision;
pub mod publish;
pub mod strip;
pub mod tag;

pub use build::BuildStep;
pub use cache::{CacheRestoreStep, CacheSaveStep};
pub use provision::ProvisionStep;
pub use publish::PublishStep;
pub use strip::StripStep;
pub use tag::TagStep;
pub use test::TestStep;

use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Step, StepContext};
use crate::process::{CommandOutput, CommandSpec};

/// The nightly pipeline in execution order
pub fn standard() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(ProvisionStep),
        Box::new(CacheRestoreStep),
        Box::new(BuildStep),
        Box::new(TestStep),
        Box::new(CacheSaveStep),
        Box::new(StripStep),
        Box::new(TagStep),
        Box::new(PublishStep),
    ]
}

/// Run a command and turn spawn failures and non-zero exits into the
/// step's own error class. `fail` receives the rendered command and the
/// output tail.
pub(crate) async fn run_checked<F>(
    ctx: &StepContext,
    spec: CommandSpec,
    fail: F,
) -> NightshiftResult<CommandOutput>
where
    F: FnOnce(String, String) -> NightshiftError + Send,
{
    let command = spec.to_string();
    let output = match ctx.exec(spec).await {
        Ok(output) => output,
        Err(e) => return Err(fail(command, e.to_string())),
    };

    if !output.success() {
        let tail = output.tail();
        let detail = if tail.is_empty() {
            format!("exit code {}", output.code)
        } else {
            format!("exit code {}\n{}", output.code, tail)
        };
        return Err(fail(command, detail));
    }
    Ok(output)
}

/// Parse a configured argv, rejecting an empty command
pub(crate) fn configured_command<F>(argv: &[String], fail: F) -> NightshiftResult<CommandSpec>
where
    F: FnOnce(String, String) -> NightshiftError,
{
    CommandSpec::from_argv(argv)
        .ok_or_else(|| fail(String::new(), "command is empty in configuration".to_string()))
}

/// Pin cargo's output to the configured target directory so an inherited
/// `CARGO_TARGET_DIR` cannot move the binary or the cached paths
pub(crate) fn cargo_env(ctx: &StepContext, spec: CommandSpec) -> CommandSpec {
    spec.env("CARGO_TARGET_DIR", ctx.target_dir().to_string_lossy())
}
