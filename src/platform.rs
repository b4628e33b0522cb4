//! Target platform detection
//!
//! Each pipeline instance builds for the platform it runs on.

use crate::error::{NightshiftError, NightshiftResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform a pipeline instance builds for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    #[serde(rename = "macos")]
    MacOS,
}

impl Platform {
    /// Detect the current platform
    pub fn detect() -> NightshiftResult<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOS),
            other => Err(NightshiftError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Get a human-readable platform name
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::Windows => "Windows",
            Platform::MacOS => "macOS",
        }
    }

    /// Short identifier used in cache keys and config
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::MacOS => "macos",
        }
    }

    /// Suffix appended to executable file names
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            _ => "",
        }
    }

    /// File name of an executable built on this platform
    pub fn executable_name(&self, binary: &str) -> String {
        format!("{}{}", binary, self.exe_suffix())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Platform {
    type Err = NightshiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" | "ubuntu-latest" => Ok(Platform::Linux),
            "windows" | "windows-latest" => Ok(Platform::Windows),
            "macos" | "macos-latest" => Ok(Platform::MacOS),
            other => Err(NightshiftError::UnsupportedPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_detect_returns_valid() {
        // Every CI host we target is one of the three
        if let Ok(platform) = Platform::detect() {
            assert!(matches!(
                platform,
                Platform::Linux | Platform::Windows | Platform::MacOS
            ));
        }
    }

    #[test]
    fn platform_name() {
        assert_eq!(Platform::Linux.name(), "Linux");
        assert_eq!(Platform::Windows.name(), "Windows");
        assert_eq!(Platform::MacOS.name(), "macOS");
    }

    #[test]
    fn executable_names() {
        assert_eq!(Platform::Linux.executable_name("snake"), "snake");
        assert_eq!(Platform::Windows.executable_name("snake"), "snake.exe");
    }

    #[test]
    fn parse_runner_labels() {
        assert_eq!("ubuntu-latest".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert!("solaris".parse::<Platform>().is_err());
    }
}
