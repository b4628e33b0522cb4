//! Configuration schema for nightshift
//!
//! Global configuration lives at `~/.config/nightshift/config.toml`,
//! project settings in a `nightshift.toml` next to the game's `Cargo.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// What is being built
    pub project: ProjectConfig,

    /// Which events start a run
    pub trigger: TriggerConfig,

    /// Toolchain and native packages
    pub provision: ProvisionConfig,

    /// Build and test commands
    pub build: BuildConfig,

    /// Dependency cache settings
    pub cache: CacheConfig,

    /// Symbol stripping
    pub strip: StripConfig,

    /// Nightly release settings
    pub release: ReleaseConfig,

    /// Version-control identity and remote
    pub git: GitConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Project being built
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Display name
    pub name: String,

    /// Executable name without platform suffix
    pub binary: String,

    /// Cargo target directory, relative to the workspace
    pub target_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "snake".to_string(),
            binary: "snake".to_string(),
            target_dir: PathBuf::from("target"),
        }
    }
}

/// Trigger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Branch whose pushes produce a nightly
    pub branch: String,

    /// Schedule in `minute hour day-of-month month weekday` form
    pub schedule: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            schedule: "0 0 1 * *".to_string(),
        }
    }
}

/// Toolchain provisioning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Skip provisioning entirely (toolchain already on the host)
    pub enabled: bool,

    /// Rust toolchain channel
    pub channel: String,

    /// Run `rustup toolchain install` (otherwise only verify)
    pub install_toolchain: bool,

    /// Native packages installed with apt-get on Linux
    pub linux_packages: Vec<String>,

    /// Prefix package installation with sudo
    pub use_sudo: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "stable".to_string(),
            install_toolchain: true,
            linux_packages: vec![
                "libxcb-render0-dev".to_string(),
                "libxcb-shape0-dev".to_string(),
                "libxcb-xfixes0-dev".to_string(),
                "libxkbcommon-dev".to_string(),
                "libssl-dev".to_string(),
                "libgtk-3-dev".to_string(),
            ],
            use_sudo: true,
        }
    }
}

/// Build and test commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Optimized build command
    pub command: Vec<String>,

    /// Test suite command
    pub test_command: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["cargo".to_string(), "build".to_string(), "--release".to_string()],
            test_command: vec!["cargo".to_string(), "test".to_string(), "--release".to_string()],
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable dependency caching (default: true)
    pub enabled: bool,

    /// Cache storage directory (default: platform cache dir)
    pub dir: Option<PathBuf>,

    /// Key prefix, bump to invalidate every entry
    pub prefix: String,

    /// Manifests hashed into the cache key, relative to the workspace
    pub manifests: Vec<String>,

    /// Directories saved and restored, relative to the workspace
    pub paths: Vec<PathBuf>,

    /// Age in days past which `cache gc` removes entries (0 = disabled)
    pub gc_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            prefix: "nightshift".to_string(),
            manifests: vec!["Cargo.lock".to_string(), "Cargo.toml".to_string()],
            paths: vec![PathBuf::from("target")],
            gc_days: 30,
        }
    }
}

/// Strip configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Strip the binary before publishing
    pub enabled: bool,

    /// Strip command; the binary path is appended
    pub command: Vec<String>,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["strip".to_string()],
        }
    }
}

/// Nightly release configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Floating tag name
    pub tag: String,

    /// Release title
    pub title: String,

    /// Release body text
    pub body: String,

    /// Repository in `owner/repo` form (default: $GITHUB_REPOSITORY)
    pub repository: Option<String>,

    /// Environment variable holding the API token
    pub token_env: String,

    /// REST API base URL
    pub api_url: String,

    /// Asset patterns relative to the workspace (empty = the stripped binary)
    pub assets: Vec<String>,

    /// Platform whose instance moves the tag
    pub tag_platform: String,

    /// Mark the release as a prerelease
    pub prerelease: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            tag: "nightly".to_string(),
            title: "Nightly".to_string(),
            body: "Automated build of the latest commit on main.".to_string(),
            repository: None,
            token_env: "GITHUB_TOKEN".to_string(),
            api_url: "https://api.github.com".to_string(),
            assets: vec![],
            tag_platform: "linux".to_string(),
            prerelease: true,
        }
    }
}

/// Git identity used for tagging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// user.name for the annotated tag
    pub user_name: String,

    /// user.email for the annotated tag
    pub user_email: String,

    /// Remote the tag is pushed to
    pub remote: String,

    /// Annotated tag message
    pub tag_message: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            user_name: "github-actions[bot]".to_string(),
            user_email: "github-actions[bot]@users.noreply.github.com".to_string(),
            remote: "origin".to_string(),
            tag_message: "Nightly build".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[release]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.release.tag, "nightly");
        assert_eq!(config.trigger.branch, "main");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [release]
            repository = "acme/snake"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.release.repository.as_deref(), Some("acme/snake"));
        assert_eq!(config.release.token_env, "GITHUB_TOKEN"); // default preserved
        assert_eq!(config.provision.channel, "stable");
    }

    #[test]
    fn default_packages_cover_gui_stack() {
        let config = ProvisionConfig::default();
        assert!(config.linux_packages.iter().any(|p| p == "libgtk-3-dev"));
        assert!(config.linux_packages.iter().any(|p| p == "libssl-dev"));
    }
}
