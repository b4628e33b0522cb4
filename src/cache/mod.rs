//! Dependency cache
//!
//! Provides content-addressed caching keyed by manifest hashes.
//! Entries are immutable once finalized.
//!
//! # Entry States
//!
//! | State | Restorable | Description |
//! |-------|------------|-------------|
//! | Miss | - | No entry exists, full build |
//! | Building | no | Save in progress or crashed, overwritten on next save |
//! | Complete | yes | Finalized, immutable |
//!
//! Cache trouble never fails a run: callers degrade to a full build.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{compute_key, detect_manifests, CacheKey, ManifestInfo};
pub use store::{format_bytes, CacheEntry, CacheLookup, CacheState, CacheStore, LocalCacheStore};
