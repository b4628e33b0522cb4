//! Manifest fingerprinting for cache keys
//!
//! Hashes the dependency manifests of a workspace into a content-addressed
//! cache key. Same manifests on the same platform and channel = same key.

use crate::error::{NightshiftError, NightshiftResult};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A detected manifest and the bytes that went into the hash
#[derive(Debug, Clone)]
pub struct ManifestInfo {
    /// Manifest name as configured (e.g. `Cargo.lock`)
    pub name: String,
    /// Absolute path to the manifest
    pub path: PathBuf,
    /// SHA256 of the manifest contents (first 12 chars)
    pub hash: String,
}

/// Content-addressed cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Key prefix from config
    pub prefix: String,
    /// Platform the artifacts were built on
    pub platform: Platform,
    /// Toolchain channel
    pub channel: String,
    /// Combined manifest hash (12 hex chars)
    pub hash: String,
}

impl CacheKey {
    /// Entry directory name for this key
    pub fn as_string(&self) -> String {
        format!("{}-{}-{}-{}", self.prefix, self.platform, self.channel, self.hash)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Hash a file's contents using SHA256, returning first 12 hex chars
fn hash_file_contents(path: &Path) -> NightshiftResult<String> {
    let contents = fs::read(path).map_err(|e| NightshiftError::Io {
        context: format!("reading manifest {}", path.display()),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let result = hasher.finalize();

    // Take first 12 hex characters (6 bytes)
    Ok(hex::encode(&result[..6]))
}

/// Detect the configured manifests present in a workspace
pub fn detect_manifests(workspace: &Path, names: &[String]) -> NightshiftResult<Vec<ManifestInfo>> {
    let mut manifests = Vec::new();

    for name in names {
        let path = workspace.join(name);
        if path.is_file() {
            debug!("Found manifest: {}", path.display());
            let hash = hash_file_contents(&path)?;
            manifests.push(ManifestInfo {
                name: name.clone(),
                path,
                hash,
            });
        }
    }

    debug!("Detected {} manifests", manifests.len());
    Ok(manifests)
}

/// Derive the cache key for a workspace.
///
/// Returns `None` when none of the manifests exist; there is nothing to
/// key a cache on and the run should simply build from scratch.
pub fn compute_key(
    workspace: &Path,
    names: &[String],
    prefix: &str,
    platform: Platform,
    channel: &str,
) -> NightshiftResult<Option<CacheKey>> {
    let manifests = detect_manifests(workspace, names)?;
    if manifests.is_empty() {
        return Ok(None);
    }

    // Order follows config so the key is stable across hosts
    let mut hasher = Sha256::new();
    for manifest in &manifests {
        hasher.update(manifest.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(manifest.hash.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    Ok(Some(CacheKey {
        prefix: prefix.to_string(),
        platform,
        channel: channel.to_string(),
        hash: hex::encode(&digest[..6]),
    }))
}
