//! Symbol stripping
//!
//! The binary is stripped in place. Anything without a recognizable
//! executable header is refused rather than handed to the stripper.

use super::run_checked;
use crate::cache::format_bytes;
use crate::config::schema::Config;
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{Step, StepContext, StepKind};
use crate::platform::Platform;
use crate::process::CommandSpec;
use async_trait::async_trait;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct StripStep;

/// Executable container formats we know how to strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableFormat {
    Elf,
    Pe,
    MachO,
}

impl fmt::Display for ExecutableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elf => write!(f, "ELF"),
            Self::Pe => write!(f, "PE"),
            Self::MachO => write!(f, "Mach-O"),
        }
    }
}

impl ExecutableFormat {
    /// Identify a format from the first bytes of a file
    pub fn detect(header: &[u8]) -> Option<Self> {
        match header {
            [0x7f, b'E', b'L', b'F', ..] => Some(Self::Elf),
            [b'M', b'Z', ..] => Some(Self::Pe),
            [0xfe, 0xed, 0xfa, 0xce | 0xcf, ..]
            | [0xce | 0xcf, 0xfa, 0xed, 0xfe, ..]
            | [0xca, 0xfe, 0xba, 0xbe, ..] => Some(Self::MachO),
            _ => None,
        }
    }
}

fn read_header(path: &Path) -> NightshiftResult<Vec<u8>> {
    let file = std::fs::File::open(path)
        .map_err(|e| NightshiftError::io(format!("opening {}", path.display()), e))?;
    let mut header = Vec::with_capacity(4);
    file.take(4)
        .read_to_end(&mut header)
        .map_err(|e| NightshiftError::io(format!("reading {}", path.display()), e))?;
    Ok(header)
}

fn file_size(path: &Path) -> NightshiftResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| NightshiftError::io(format!("reading {}", path.display()), e))
}

#[async_trait]
impl Step for StripStep {
    fn kind(&self) -> StepKind {
        StepKind::Strip
    }

    fn skip_reason(&self, config: &Config, _platform: Platform) -> Option<String> {
        (!config.strip.enabled).then(|| "stripping disabled".to_string())
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let path: PathBuf = ctx.binary.clone().unwrap_or_else(|| ctx.expected_binary());
        if !path.is_file() {
            return Err(NightshiftError::BinaryMissing(path));
        }

        let format = ExecutableFormat::detect(&read_header(&path)?).ok_or_else(|| {
            NightshiftError::Unstrippable {
                path: path.clone(),
                reason: "unrecognized executable header".to_string(),
            }
        })?;

        let before = file_size(&path)?;

        let spec = CommandSpec::from_argv(&ctx.config.strip.command)
            .ok_or_else(|| NightshiftError::Strip {
                path: path.clone(),
                output: "strip command is empty in configuration".to_string(),
            })?
            .arg(path.to_string_lossy());

        let failed = path.clone();
        run_checked(ctx, spec, move |_, output| NightshiftError::Strip {
            path: failed,
            output,
        })
        .await?;

        let after = file_size(&path)?;
        ctx.binary = Some(path);
        Ok(format!(
            "{} {} -> {}",
            format,
            format_bytes(before),
            format_bytes(after)
        ))
    }
}
