//! Optimized build

use super::{cargo_env, configured_command, run_checked};
use crate::cache::format_bytes;
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Step, StepContext, StepKind};
use async_trait::async_trait;
use tracing::info;

pub struct BuildStep;

fn compile_error(command: String, output: String) -> NightshiftError {
    NightshiftError::Compile { command, output }
}

#[async_trait]
impl Step for BuildStep {
    fn kind(&self) -> StepKind {
        StepKind::Build
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let spec = cargo_env(ctx, configured_command(&ctx.config.build.command, compile_error)?);
        let command = spec.to_string();
        info!("Building: {}", command);
        run_checked(ctx, spec, compile_error).await?;

        // Exactly one executable, at a known location
        let binary = ctx.expected_binary();
        let size = match std::fs::metadata(&binary) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Err(compile_error(
                    command,
                    format!("no executable produced at {}", binary.display()),
                ))
            }
        };

        let name = ctx.platform.executable_name(&ctx.config.project.binary);
        ctx.binary = Some(binary);
        Ok(format!("{} ({})", name, format_bytes(size)))
    }
}
