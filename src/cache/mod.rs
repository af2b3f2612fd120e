//! Bundle reference cache with dependency-based invalidation.
//!
//! The backing store is pluggable ([`CacheStore`]); [`MemoryCache`] is the
//! in-process default. Whatever the backing, an entry whose dependency is
//! stale is never returned.

mod dependency;
mod memory;

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::{CacheKey, GroupOutput};

pub use dependency::{Dependency, FileStamp};
pub use memory::MemoryCache;

/// A cached group reference.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: GroupOutput,
    pub dependency: Dependency,
    pub created: SystemTime,
}

impl CacheEntry {
    pub fn new(value: GroupOutput, dependency: Dependency) -> Self {
        Self {
            key: value.key.clone(),
            value,
            dependency,
            created: SystemTime::now(),
        }
    }
}

/// Key/value store safe for concurrent `get`/`insert` from worker threads.
pub trait CacheStore: Send + Sync {
    /// Fresh entry for `key`, if any. Stale entries are evicted, not returned.
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    /// Insert or replace the entry for `entry.key`.
    fn insert(&self, entry: CacheEntry);

    /// Remove one entry; returns whether it existed.
    fn remove(&self, key: &CacheKey) -> bool;

    /// Remove every entry whose dependency mentions `path`.
    fn remove_dependents(&self, path: &Path) -> usize;

    fn clear(&self);
}
