//! Configuration management for nightshift

pub mod schema;

pub use schema::Config;

use crate::error::{NightshiftError, NightshiftResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of the project-local config
pub const LOCAL_CONFIG_NAME: &str = "nightshift.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nightshift")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nightshift")
    }

    /// Get the default dependency cache directory
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| Self::state_dir().join("cache"))
            .join("nightshift")
    }

    /// Get the audit log path
    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Walk up from `start` looking for a project-local config
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> NightshiftResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> NightshiftResult<Config> {
        let value = read_toml(path).await?;
        value.try_into().map_err(|e: toml::de::Error| NightshiftError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config with a project-local file layered on top.
    ///
    /// Tables merge key by key; a local scalar or array replaces the global one.
    pub async fn load_merged(&self, local: Option<&Path>) -> NightshiftResult<Config> {
        let mut merged = if self.config_path.exists() {
            read_toml(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        if let Some(local_path) = local {
            let overlay = read_toml(local_path).await?;
            merge_toml(&mut merged, overlay);
        }

        let origin = local.unwrap_or(&self.config_path).to_path_buf();
        merged
            .try_into()
            .map_err(|e: toml::de::Error| NightshiftError::ConfigInvalid {
                path: origin,
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> NightshiftResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            NightshiftError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> NightshiftResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| NightshiftError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists
    pub async fn ensure_state_dirs() -> NightshiftResult<()> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| NightshiftError::io(format!("creating directory {}", dir.display()), e))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_toml(path: &Path) -> NightshiftResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| NightshiftError::io(format!("reading config from {}", path.display()), e))?;

    content
        .parse::<toml::Value>()
        .map_err(|e| NightshiftError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Deep-merge `overlay` into `base`
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) if existing.is_table() && value.is_table() => {
                        merge_toml(existing, value)
                    }
                    _ => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.release.tag, "nightly");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.project.binary = "worm".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.project.binary, "worm");
    }

    #[tokio::test]
    async fn local_config_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        std::fs::write(
            &global,
            "[release]\nrepository = \"acme/snake\"\ntitle = \"Global\"\n",
        )
        .unwrap();
        let local = temp.path().join(LOCAL_CONFIG_NAME);
        std::fs::write(&local, "[release]\ntitle = \"Local\"\n").unwrap();

        let manager = ConfigManager::with_path(global);
        let config = manager.load_merged(Some(&local)).await.unwrap();

        assert_eq!(config.release.title, "Local");
        assert_eq!(config.release.repository.as_deref(), Some("acme/snake"));
    }

    #[tokio::test]
    async fn invalid_local_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join(LOCAL_CONFIG_NAME);
        std::fs::write(&local, "[release\n").unwrap();

        let manager = ConfigManager::with_path(temp.path().join("missing.toml"));
        let err = manager.load_merged(Some(&local)).await.unwrap_err();
        assert!(matches!(err, NightshiftError::ConfigInvalid { .. }));
    }

    #[test]
    fn find_local_config_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(LOCAL_CONFIG_NAME), "").unwrap();
        let nested = temp.path().join("src").join("bin");
        std::fs::create_dir_all(&nested).unwrap();

        let found = ConfigManager::find_local_config(&nested).unwrap();
        assert_eq!(found, temp.path().join(LOCAL_CONFIG_NAME));
    }
}
