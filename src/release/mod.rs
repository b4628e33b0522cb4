//! Nightly release publishing
//!
//! One shared release per tag. Every pipeline instance publishes into it:
//! the release is found or created, its metadata brought up to date, and
//! each asset replaces any existing asset of the same name. Instances never
//! coordinate; the last writer of a given asset name wins.

pub mod github;
#[cfg(test)]
pub(crate) mod memory;

pub use github::GithubReleaseHost;

use crate::audit::AuditLog;
use crate::error::{NightshiftError, NightshiftResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A release on the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag: String,
    pub name: String,
    pub body: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Asset with the given file name, if attached
    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Whether title, body and prerelease flag already match `spec`
    pub fn matches(&self, spec: &ReleaseSpec) -> bool {
        self.name == spec.title && self.body == spec.body && self.prerelease == spec.prerelease
    }
}

/// A file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    pub size: u64,
}

/// Desired release metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub tag: String,
    pub title: String,
    pub body: String,
    /// Commit the release is created against
    pub commit: String,
    pub prerelease: bool,
}

/// A local file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Upload name (the file name)
    pub name: String,
    pub path: PathBuf,
}

/// What a publish did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub release_id: u64,
    pub created: bool,
    pub uploaded: Vec<String>,
    pub replaced: Vec<String>,
}

/// Release hosting service
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Look up the release for a tag
    async fn find_release(&self, tag: &str) -> NightshiftResult<Option<Release>>;

    /// Create a release for `spec.tag` targeting `spec.commit`
    async fn create_release(&self, spec: &ReleaseSpec) -> NightshiftResult<Release>;

    /// Overwrite title, body and prerelease flag
    async fn update_release(&self, release: &Release, spec: &ReleaseSpec) -> NightshiftResult<Release>;

    /// Delete an attached asset
    async fn delete_asset(&self, release: &Release, asset: &ReleaseAsset) -> NightshiftResult<()>;

    /// Upload a file as a new asset
    async fn upload_asset(&self, release: &Release, file: &AssetFile) -> NightshiftResult<ReleaseAsset>;
}

/// Expand asset patterns relative to `workspace`.
///
/// Every pattern must match at least one file, and no two resolved files
/// may share a file name.
pub fn resolve_assets(workspace: &Path, patterns: &[String]) -> NightshiftResult<Vec<AssetFile>> {
    let mut seen_paths = BTreeSet::new();
    let mut by_name: HashMap<String, PathBuf> = HashMap::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            workspace.join(pattern)
        };
        let full = full.to_string_lossy().to_string();

        let entries = glob::glob(&full).map_err(|e| NightshiftError::AssetPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut matched = 0;
        for path in entries.filter_map(Result::ok).filter(|p| p.is_file()) {
            matched += 1;
            if !seen_paths.insert(path.clone()) {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| NightshiftError::AssetPattern {
                    pattern: pattern.clone(),
                    reason: format!("{} has no file name", path.display()),
                })?;

            if by_name.insert(name.clone(), path.clone()).is_some() {
                return Err(NightshiftError::DuplicateAsset { name });
            }
            debug!("Asset {} -> {}", name, path.display());
            files.push(AssetFile { name, path });
        }

        if matched == 0 {
            return Err(NightshiftError::UnmatchedAsset {
                pattern: pattern.clone(),
            });
        }
    }

    Ok(files)
}

/// Bring the release for `spec.tag` up to date and attach `assets`
pub async fn publish(
    host: &dyn ReleaseHost,
    spec: &ReleaseSpec,
    assets: &[AssetFile],
    audit: &AuditLog,
) -> NightshiftResult<PublishReport> {
    let mut report = PublishReport::default();

    let release = match host.find_release(&spec.tag).await? {
        Some(existing) if !existing.matches(spec) => {
            debug!("Updating metadata of release {}", existing.id);
            host.update_release(&existing, spec).await?
        }
        Some(existing) => existing,
        None => {
            info!("Creating release {} at {}", spec.tag, spec.commit);
            report.created = true;
            host.create_release(spec).await?
        }
    };
    report.release_id = release.id;

    for file in assets {
        if let Some(old) = release.asset(&file.name) {
            host.delete_asset(&release, old).await?;
            audit
                .log(
                    "asset.replaced",
                    &serde_json::json!({
                        "tag": spec.tag,
                        "asset": old.name,
                        "previous_size": old.size,
                        "commit": spec.commit,
                    }),
                )
                .await;
            report.replaced.push(file.name.clone());
        }

        let uploaded = host.upload_asset(&release, file).await?;
        info!("Uploaded {} ({} bytes)", uploaded.name, uploaded.size);
        report.uploaded.push(uploaded.name);
    }

    Ok(report)
}
