//! Cache entry storage
//!
//! Entries live in `<cache_dir>/<key>/` as an `entry.json` record plus one
//! gzipped tarball per cached path. Tracks entry state (building, complete)
//! so a crashed save never gets restored.

use crate::cache::fingerprint::CacheKey;
use crate::error::{NightshiftError, NightshiftResult};
use crate::process::run_blocking;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ENTRY_FILE: &str = "entry.json";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// State of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No entry exists for the key
    Miss,
    /// Save in progress or crashed, not restorable
    Building,
    /// Finalized and immutable
    Complete,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Miss => write!(f, "miss"),
            Self::Building => write!(f, "building"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Persisted record of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Full key string
    pub key: String,
    /// Entry state
    pub state: CacheState,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Workspace-relative paths, in bundle order
    pub paths: Vec<PathBuf>,
    /// Total bundle size in bytes
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Check if this entry is older than the given number of days
    pub fn is_older_than_days(&self, days: u32) -> bool {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        self.created_at < cutoff
    }

    /// Complete and holding at least one bundle
    pub fn is_restorable(&self) -> bool {
        self.state == CacheState::Complete && !self.paths.is_empty()
    }
}

/// Outcome of a restore attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry restored; number of paths unpacked
    Hit { restored: usize },
    /// No complete entry for the key
    Miss,
}

/// Abstract cache storage
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore a complete entry's bundles into `workspace`
    async fn restore(&self, key: &CacheKey, workspace: &Path) -> NightshiftResult<CacheLookup>;

    /// Save `paths` (relative to `workspace`) under `key`.
    ///
    /// Returns `false` when a complete entry already exists.
    async fn save(&self, key: &CacheKey, workspace: &Path, paths: &[PathBuf])
        -> NightshiftResult<bool>;

    /// List all entries
    async fn list(&self) -> NightshiftResult<Vec<CacheEntry>>;

    /// Remove an entry by key string
    async fn remove(&self, key: &str) -> NightshiftResult<()>;
}

/// Cache store on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Read an entry record; `None` when absent or unreadable
    pub fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_dir(key).join(ENTRY_FILE);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring corrupt cache record {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> NightshiftResult<()> {
        let path = self.entry_dir(&entry.key).join(ENTRY_FILE);
        let content = serde_json::to_string_pretty(entry)?;
        fs::write(&path, content)
            .map_err(|e| NightshiftError::io(format!("writing {}", path.display()), e))
    }

    fn restore_blocking(&self, key: &str, workspace: &Path) -> NightshiftResult<CacheLookup> {
        let entry = match self.read_entry(key) {
            Some(entry) if entry.is_restorable() => entry,
            Some(_) => {
                debug!("Cache entry {} is incomplete or empty, treating as miss", key);
                return Ok(CacheLookup::Miss);
            }
            None => return Ok(CacheLookup::Miss),
        };

        let dir = self.entry_dir(key);
        for (index, rel) in entry.paths.iter().enumerate() {
            let bundle = dir.join(bundle_name(index));
            let dest = workspace.join(rel);
            fs::create_dir_all(&dest)
                .map_err(|e| NightshiftError::io(format!("creating {}", dest.display()), e))?;

            let file = fs::File::open(&bundle)
                .map_err(|e| NightshiftError::io(format!("opening {}", bundle.display()), e))?;
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            archive.set_preserve_mtime(true);
            archive.unpack(&dest).map_err(|e| {
                NightshiftError::Cache(format!("unpacking {}: {}", bundle.display(), e))
            })?;
            debug!("Restored {} from {}", dest.display(), bundle.display());
        }

        Ok(CacheLookup::Hit {
            restored: entry.paths.len(),
        })
    }

    fn save_blocking(
        &self,
        key: &str,
        workspace: &Path,
        paths: &[PathBuf],
    ) -> NightshiftResult<bool> {
        if let Some(existing) = self.read_entry(key) {
            if existing.is_restorable() {
                debug!("Cache entry {} already complete, not overwriting", key);
                return Ok(false);
            }
        }

        let present: Vec<PathBuf> = paths
            .iter()
            .filter(|rel| workspace.join(rel).is_dir())
            .cloned()
            .collect();
        if present.is_empty() {
            let wanted: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            return Err(NightshiftError::Cache(format!(
                "none of the cache paths exist in {}: {}",
                workspace.display(),
                wanted.join(", ")
            )));
        }

        let dir = self.entry_dir(key);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| NightshiftError::io(format!("clearing {}", dir.display()), e))?;
        }
        fs::create_dir_all(&dir)
            .map_err(|e| NightshiftError::io(format!("creating {}", dir.display()), e))?;

        let mut entry = CacheEntry {
            key: key.to_string(),
            state: CacheState::Building,
            created_at: Utc::now(),
            paths: present,
            size_bytes: 0,
        };
        self.write_entry(&entry)?;

        for (index, rel) in entry.paths.iter().enumerate() {
            let bundle = dir.join(bundle_name(index));
            write_bundle(&workspace.join(rel), &bundle)?;
            entry.size_bytes += fs::metadata(&bundle).map(|m| m.len()).unwrap_or(0);
        }

        entry.state = CacheState::Complete;
        self.write_entry(&entry)?;
        info!(
            "Saved cache entry {} ({})",
            key,
            format_bytes(entry.size_bytes)
        );
        Ok(true)
    }

    fn list_blocking(&self) -> NightshiftResult<Vec<CacheEntry>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let reader = fs::read_dir(&self.root)
            .map_err(|e| NightshiftError::io(format!("reading {}", self.root.display()), e))?;

        let mut entries: Vec<CacheEntry> = reader
            .filter_map(|dirent| dirent.ok())
            .filter_map(|dirent| {
                let name = dirent.file_name().to_string_lossy().to_string();
                self.read_entry(&name)
            })
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

fn bundle_name(index: usize) -> String {
    format!("{}.tar.gz", index)
}

/// Create a gzipped tar archive of a directory's contents
fn write_bundle(src: &Path, dst_file: &Path) -> NightshiftResult<()> {
    let file = fs::File::create(dst_file)
        .map_err(|e| NightshiftError::io(format!("creating {}", dst_file.display()), e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::fast()));
    builder.follow_symlinks(false);

    builder
        .append_dir_all(".", src)
        .map_err(|e| NightshiftError::Cache(format!("archiving {}: {}", src.display(), e)))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| NightshiftError::Cache(format!("finalizing {}: {}", dst_file.display(), e)))?;
    encoder
        .finish()
        .map_err(|e| NightshiftError::Cache(format!("compressing {}: {}", dst_file.display(), e)))?;
    Ok(())
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn restore(&self, key: &CacheKey, workspace: &Path) -> NightshiftResult<CacheLookup> {
        let store = self.clone();
        let key = key.as_string();
        let workspace = workspace.to_path_buf();
        run_blocking("cache", move || store.restore_blocking(&key, &workspace)).await
    }

    async fn save(
        &self,
        key: &CacheKey,
        workspace: &Path,
        paths: &[PathBuf],
    ) -> NightshiftResult<bool> {
        let store = self.clone();
        let key = key.as_string();
        let workspace = workspace.to_path_buf();
        let paths = paths.to_vec();
        run_blocking("cache", move || store.save_blocking(&key, &workspace, &paths)).await
    }

    async fn list(&self) -> NightshiftResult<Vec<CacheEntry>> {
        let store = self.clone();
        run_blocking("cache", move || store.list_blocking()).await
    }

    async fn remove(&self, key: &str) -> NightshiftResult<()> {
        let dir = self.entry_dir(key);
        if !dir.exists() {
            return Err(NightshiftError::PathNotFound(dir));
        }
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| NightshiftError::io(format!("removing {}", dir.display()), e))
    }
}
