//! Error types for nightshift
//!
//! All modules use `NightshiftResult<T>` as their return type.

use crate::pipeline::StepKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nightshift operations
pub type NightshiftResult<T> = Result<T, NightshiftError>;

/// All errors that can occur in nightshift
#[derive(Error, Debug)]
pub enum NightshiftError {
    // Provisioning errors
    #[error("Toolchain provisioning failed: {reason}")]
    Provision { reason: String },

    #[error("Could not determine toolchain version from: {0}")]
    ToolchainVersion(String),

    // Build errors
    #[error("Compilation failed: {command}\n{output}")]
    Compile { command: String, output: String },

    #[error("Tests failed: {command}\n{output}")]
    TestFailed { command: String, output: String },

    // Post-processing errors
    #[error("Binary not found: {0}")]
    BinaryMissing(PathBuf),

    #[error("Binary cannot be stripped: {path}: {reason}")]
    Unstrippable { path: PathBuf, reason: String },

    #[error("Strip failed for {path}: {output}")]
    Strip { path: PathBuf, output: String },

    // Release errors
    #[error("Tagging failed: {command}: {output}")]
    Tag { command: String, output: String },

    #[error("Asset pattern matched no files: {pattern}")]
    UnmatchedAsset { pattern: String },

    #[error("Invalid asset pattern {pattern}: {reason}")]
    AssetPattern { pattern: String, reason: String },

    #[error("Two assets share the file name {name}")]
    DuplicateAsset { name: String },

    #[error("Release API error ({status}): {message}")]
    ReleaseApi { status: u16, message: String },

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Release token not set (expected in ${0})")]
    MissingToken(String),

    #[error("Release repository not configured")]
    MissingRepository,

    // Cache errors (never fatal to a run)
    #[error("Cache unavailable: {0}")]
    Cache(String),

    // Trigger errors
    #[error("Invalid schedule expression {expr}: {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("Unknown trigger event: {0}")]
    InvalidEvent(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl NightshiftError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether this error must abort the pipeline instance.
    ///
    /// Only cache trouble degrades instead of failing the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cache(_))
    }

    /// The pipeline step this error class belongs to, if any
    pub fn step(&self) -> Option<StepKind> {
        match self {
            Self::Provision { .. } | Self::ToolchainVersion(_) => Some(StepKind::Provision),
            Self::Compile { .. } => Some(StepKind::Build),
            Self::TestFailed { .. } => Some(StepKind::Test),
            Self::BinaryMissing(_) | Self::Unstrippable { .. } | Self::Strip { .. } => {
                Some(StepKind::Strip)
            }
            Self::Tag { .. } => Some(StepKind::Tag),
            Self::UnmatchedAsset { .. }
            | Self::AssetPattern { .. }
            | Self::DuplicateAsset { .. }
            | Self::ReleaseApi { .. }
            | Self::Publish(_)
            | Self::MissingToken(_)
            | Self::MissingRepository => Some(StepKind::Publish),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Provision { .. } => Some("Check that rustup is installed and the package list is valid"),
            Self::MissingToken(_) => Some("Export a token with contents:write scope, e.g. GITHUB_TOKEN"),
            Self::MissingRepository => {
                Some("Set release.repository = \"owner/repo\" or export GITHUB_REPOSITORY")
            }
            Self::UnmatchedAsset { .. } => Some("Check release.assets; paths are relative to the workspace"),
            Self::Tag { .. } => Some("The token needs permission to push tags to the remote"),
            Self::Unstrippable { .. } => Some("The build produced something that is not an executable"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = NightshiftError::UnmatchedAsset {
            pattern: "target/release/snake".to_string(),
        };
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn error_hint() {
        let err = NightshiftError::MissingRepository;
        assert!(err.hint().unwrap().contains("GITHUB_REPOSITORY"));
    }

    #[test]
    fn cache_errors_are_not_fatal() {
        assert!(!NightshiftError::Cache("disk full".to_string()).is_fatal());
        assert!(NightshiftError::Publish("boom".to_string()).is_fatal());
    }

    #[test]
    fn error_maps_to_step() {
        let compile = NightshiftError::Compile {
            command: "cargo build".to_string(),
            output: String::new(),
        };
        assert_eq!(compile.step(), Some(StepKind::Build));
        assert_eq!(
            NightshiftError::BinaryMissing(PathBuf::from("snake")).step(),
            Some(StepKind::Strip)
        );
        assert_eq!(NightshiftError::Internal("x".to_string()).step(), None);
    }
}
