//! Time-based response cache for provider lookups.
//!
//! Provides per-instance memoization of upstream responses keyed by lookup
//! key (the request URL for the GitHub provider).
//! - Entries expire after the TTL given at insert time
//! - No invalidation on content change: callers wait out the TTL
//! - Expired entries are dropped lazily on the next read of that key
//! - An optional capacity bounds the map: a full insert first drops expired
//!   entries, then the oldest one
//!
//! Writes are last-write-wins. Re-fetching a key yields the same value, so
//! two concurrent misses for one key are harmless.
//!
//! Used by: `GitHubDataProvider` (default branch ~1 day, tree/contents/commits
//! ~10 minutes), the host's per-subdomain provider registry (bounded)

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// Cached value plus its expiry deadline
#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CachedEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) < self.ttl
    }
}

pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CachedEntry<V>>>,
    capacity: Option<usize>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: None,
        }
    }

    /// Cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    // A poisoned lock only means another request panicked mid-insert; the
    // map itself is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a fresh value, dropping the entry if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.lock();

        if let Some(capacity) = self.capacity {
            if !entries.contains_key(&key) && entries.len() >= capacity {
                entries.retain(|_, entry| entry.is_fresh(now));
            }
            if !entries.contains_key(&key) && entries.len() >= capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CachedEntry {
                value,
                inserted_at: now,
                ttl,
            },
        );
    }

    /// Get cache statistics for debugging
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.lock();
        let fresh = entries.values().filter(|e| e.is_fresh(now)).count();

        CacheStats {
            entries: entries.len(),
            fresh,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub fresh: usize,
}
