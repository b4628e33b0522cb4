//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_NAME};
use crate::error::{NightshiftError, NightshiftResult};
use crate::platform::Platform;
use crate::trigger::MonthlySchedule;
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};
use tokio::fs;
use toml_edit::{Array, DocumentMut};

/// How a value given on the command line is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Str,
    Bool,
    Int,
    /// Comma-separated list
    List,
    /// Whitespace-separated command line
    Argv,
}

/// Every settable key
const KEYS: &[(&str, ValueKind)] = &[
    ("general.log_format", ValueKind::Str),
    ("general.audit_log", ValueKind::Bool),
    ("project.name", ValueKind::Str),
    ("project.binary", ValueKind::Str),
    ("project.target_dir", ValueKind::Str),
    ("trigger.branch", ValueKind::Str),
    ("trigger.schedule", ValueKind::Str),
    ("provision.enabled", ValueKind::Bool),
    ("provision.channel", ValueKind::Str),
    ("provision.install_toolchain", ValueKind::Bool),
    ("provision.linux_packages", ValueKind::List),
    ("provision.use_sudo", ValueKind::Bool),
    ("build.command", ValueKind::Argv),
    ("build.test_command", ValueKind::Argv),
    ("cache.enabled", ValueKind::Bool),
    ("cache.dir", ValueKind::Str),
    ("cache.prefix", ValueKind::Str),
    ("cache.manifests", ValueKind::List),
    ("cache.paths", ValueKind::List),
    ("cache.gc_days", ValueKind::Int),
    ("strip.enabled", ValueKind::Bool),
    ("strip.command", ValueKind::Argv),
    ("release.tag", ValueKind::Str),
    ("release.title", ValueKind::Str),
    ("release.body", ValueKind::Str),
    ("release.repository", ValueKind::Str),
    ("release.token_env", ValueKind::Str),
    ("release.api_url", ValueKind::Str),
    ("release.assets", ValueKind::List),
    ("release.tag_platform", ValueKind::Str),
    ("release.prerelease", ValueKind::Bool),
    ("git.user_name", ValueKind::Str),
    ("git.user_email", ValueKind::Str),
    ("git.remote", ValueKind::Str),
    ("git.tag_message", ValueKind::Str),
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> NightshiftResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            let ctx = UiContext::detect();
            let path = if local {
                local_config_path()?
            } else {
                manager.path().to_path_buf()
            };
            set_value(&path, &key, &value).await?;
            ui::step_ok(
                &ctx,
                &format!("Set {} = {} in {}", key, value, path.display()),
            );
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> NightshiftResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> NightshiftResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// The nearest project-local config, or one in the current directory
fn local_config_path() -> NightshiftResult<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| NightshiftError::io("getting current directory", e))?;
    Ok(ConfigManager::find_local_config(&cwd).unwrap_or_else(|| cwd.join(LOCAL_CONFIG_NAME)))
}

/// Set `key` in the TOML file at `path`, keeping its comments and layout.
///
/// The edited document must still load as a [`Config`] before anything is
/// written.
async fn set_value(path: &Path, key: &str, value: &str) -> NightshiftResult<()> {
    let kind = key_kind(key)?;
    validate_value(key, value)?;

    let mut doc = if path.exists() {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| NightshiftError::io(format!("reading {}", path.display()), e))?;
        content
            .parse::<DocumentMut>()
            .map_err(|e| NightshiftError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
    } else {
        DocumentMut::new()
    };

    set_document_value(&mut doc, key, kind, value)?;

    let content = doc.to_string();
    toml::from_str::<Config>(&content).map_err(|e| NightshiftError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| NightshiftError::ConfigDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| NightshiftError::io(format!("writing {}", path.display()), e))
}

fn key_kind(key: &str) -> NightshiftResult<ValueKind> {
    KEYS.iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| {
            let valid: Vec<&str> = KEYS.iter().map(|(name, _)| *name).collect();
            NightshiftError::User(format!(
                "Unknown config key: {}\nValid keys:\n  {}",
                key,
                valid.join("\n  ")
            ))
        })
}

/// Reject values that parse as TOML but could never run
fn validate_value(key: &str, value: &str) -> NightshiftResult<()> {
    match key {
        "trigger.schedule" => value.parse::<MonthlySchedule>().map(|_| ()),
        "release.tag_platform" => value.parse::<Platform>().map(|_| ()),
        "general.log_format" if value != "text" && value != "json" => Err(NightshiftError::User(
            format!("Invalid log format: {}. Use text or json", value),
        )),
        _ => Ok(()),
    }
}

fn set_document_value(
    doc: &mut DocumentMut,
    key: &str,
    kind: ValueKind,
    value: &str,
) -> NightshiftResult<()> {
    let Some((section, field)) = key.split_once('.') else {
        return Err(NightshiftError::User(format!("Unknown config key: {}", key)));
    };

    let item = match kind {
        ValueKind::Str => toml_edit::value(value),
        ValueKind::Bool => toml_edit::value(parse_bool(value)?),
        ValueKind::Int => toml_edit::value(i64::from(parse_u32(value)?)),
        ValueKind::List => toml_edit::value(string_array(
            value.split(',').map(str::trim).filter(|s| !s.is_empty()),
        )),
        ValueKind::Argv => toml_edit::value(string_array(value.split_whitespace())),
    };

    let table = doc
        .entry(section)
        .or_insert(toml_edit::table())
        .as_table_mut()
        .ok_or_else(|| NightshiftError::User(format!("Expected table at key: {}", section)))?;
    table.insert(field, item);
    Ok(())
}

fn string_array<'a>(items: impl Iterator<Item = &'a str>) -> Array {
    let mut array = Array::new();
    for item in items {
        array.push(item);
    }
    array
}

fn parse_bool(value: &str) -> NightshiftResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(NightshiftError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u32(value: &str) -> NightshiftResult<u32> {
    value
        .parse()
        .map_err(|_| NightshiftError::User(format!("Invalid number: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn set_creates_file_with_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        set_value(&path, "release.tag", "edge").await.unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.release.tag, "edge");
    }

    #[tokio::test]
    async fn set_preserves_comments_and_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_NAME);
        std::fs::write(
            &path,
            "# project settings\n[release]\n# where binaries go\ntag = \"nightly\"\ntitle = \"Nightly\"\n",
        )
        .unwrap();

        set_value(&path, "release.tag", "edge").await.unwrap();
        set_value(&path, "cache.gc_days", "7").await.unwrap();
        set_value(&path, "build.command", "cargo build --release --locked").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# where binaries go"));
        assert!(content.contains("title = \"Nightly\""));
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.release.tag, "edge");
        assert_eq!(config.cache.gc_days, 7);
        assert_eq!(
            config.build.command,
            vec!["cargo", "build", "--release", "--locked"]
        );
    }

    #[tokio::test]
    async fn list_values_split_on_commas() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_NAME);

        set_value(&path, "release.assets", "dist/*.tar.gz, README.md,").await.unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.release.assets, vec!["dist/*.tar.gz", "README.md"]);
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_NAME);

        let err = set_value(&path, "release.colour", "blue").await.unwrap_err();
        assert!(err.to_string().contains("release.tag"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_NAME);

        assert!(set_value(&path, "release.prerelease", "maybe").await.is_err());
        assert!(set_value(&path, "cache.gc_days", "-1").await.is_err());
        assert!(set_value(&path, "trigger.schedule", "0 0 * * 1").await.is_err());
        assert!(set_value(&path, "release.tag_platform", "amiga").await.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn every_key_exists_in_schema() {
        let defaults = toml::Value::try_from(Config::default()).unwrap();
        for (key, _) in KEYS {
            let (section, field) = key.split_once('.').unwrap();
            let table = defaults.get(section).and_then(|v| v.as_table()).unwrap();
            // Optional fields are absent from the serialized defaults
            if !matches!(*key, "cache.dir" | "release.repository") {
                assert!(table.contains_key(field), "{}", key);
            }
        }
    }
}
