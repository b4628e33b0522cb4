//! In-memory release host for tests

use super::{AssetFile, Release, ReleaseAsset, ReleaseHost, ReleaseSpec};
use crate::error::{NightshiftError, NightshiftResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MemoryReleaseHost {
    releases: Mutex<Vec<Release>>,
    created_commits: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_uploads: bool,
}

impl MemoryReleaseHost {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Host whose uploads always fail
    pub(crate) fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    fn id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn seed_release(&self, tag: &str, name: &str, body: &str, assets: &[(&str, u64)]) {
        let release = Release {
            id: self.id(),
            tag: tag.to_string(),
            name: name.to_string(),
            body: body.to_string(),
            prerelease: true,
            upload_url: String::new(),
            assets: assets
                .iter()
                .map(|(name, size)| ReleaseAsset {
                    id: self.id(),
                    name: name.to_string(),
                    size: *size,
                })
                .collect(),
        };
        self.releases.lock().unwrap().push(release);
    }

    pub(crate) fn release(&self, tag: &str) -> Option<Release> {
        self.releases
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.tag == tag)
            .cloned()
    }

    pub(crate) fn created_commits(&self) -> Vec<String> {
        self.created_commits.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseHost for MemoryReleaseHost {
    async fn find_release(&self, tag: &str) -> NightshiftResult<Option<Release>> {
        Ok(self.release(tag))
    }

    async fn create_release(&self, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let release = Release {
            id: self.id(),
            tag: spec.tag.clone(),
            name: spec.title.clone(),
            body: spec.body.clone(),
            prerelease: spec.prerelease,
            upload_url: String::new(),
            assets: vec![],
        };
        self.created_commits.lock().unwrap().push(spec.commit.clone());
        self.releases.lock().unwrap().push(release.clone());
        Ok(release)
    }

    async fn update_release(&self, release: &Release, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or(NightshiftError::ReleaseApi {
                status: 404,
                message: "Not Found".to_string(),
            })?;
        stored.name = spec.title.clone();
        stored.body = spec.body.clone();
        stored.prerelease = spec.prerelease;
        Ok(stored.clone())
    }

    async fn delete_asset(&self, release: &Release, asset: &ReleaseAsset) -> NightshiftResult<()> {
        let mut releases = self.releases.lock().unwrap();
        if let Some(stored) = releases.iter_mut().find(|r| r.id == release.id) {
            stored.assets.retain(|a| a.id != asset.id);
        }
        Ok(())
    }

    async fn upload_asset(&self, release: &Release, file: &AssetFile) -> NightshiftResult<ReleaseAsset> {
        if self.fail_uploads {
            return Err(NightshiftError::ReleaseApi {
                status: 500,
                message: "upload rejected".to_string(),
            });
        }

        let size = std::fs::metadata(&file.path)
            .map_err(|e| NightshiftError::io(format!("reading {}", file.path.display()), e))?
            .len();
        let asset = ReleaseAsset {
            id: self.id(),
            name: file.name.clone(),
            size,
        };

        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or(NightshiftError::ReleaseApi {
                status: 404,
                message: "Not Found".to_string(),
            })?;
        if stored.assets.iter().any(|a| a.name == asset.name) {
            return Err(NightshiftError::ReleaseApi {
                status: 422,
                message: format!("asset {} already_exists", asset.name),
            });
        }
        stored.assets.push(asset.clone());
        self.uploads.lock().unwrap().push(file.name.clone());
        Ok(asset)
    }
}
