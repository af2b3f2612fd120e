//! In-process cache store backed by `DashMap`.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use crate::core::CacheKey;
use crate::file::RetryPolicy;

use super::{CacheEntry, CacheStore};

/// Thread-safe in-memory [`CacheStore`].
///
/// Freshness is checked on every `get` by re-stamping the dependency files.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    policy: RetryPolicy,
}

impl MemoryCache {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        // Clone out so the shard lock is not held while hashing files
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;

        if entry.dependency.is_stale(&self.policy) {
            // Only evict the entry we checked; a newer one may have landed
            self.entries
                .remove_if(key, |_, current| Arc::ptr_eq(current, &entry));
            crate::debug!("cache"; "evicted stale {}", key);
            return None;
        }
        Some(entry)
    }

    fn insert(&self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), Arc::new(entry));
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    fn remove_dependents(&self, path: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.dependency.mentions(path));
        before - self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
