//! Shared byte-budgeted LRU cache with namespaced keyspaces.
//!
//! One cache, one eviction pool, one byte budget. Independent concerns
//! (resource caching, generation-level caching) each get a [`Keyspace`]
//! whose string prefix keeps their keys from colliding while entries from
//! every keyspace compete for the same budget.
//!
//! Keyspaces hold a clone of the shared handle, so a keyspace can never
//! outlive the cache it partitions. Tests run sequentially; the mutex is
//! bookkeeping, not a concurrency contract.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One megabyte, for megabyte-denominated budgets (`512 * MB`).
pub const MB: usize = 1 << 20;

#[derive(Debug)]
struct Entry {
    bytes: Vec<u8>,
    last_used: u64,
}

#[derive(Debug)]
struct CacheInner {
    budget: usize,
    total: usize,
    clock: u64,
    entries: HashMap<String, Entry>,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        self.clock += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used = self.clock;
        }
    }

    fn evict_to_budget(&mut self) {
        while self.total > self.budget {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.total -= entry.bytes.len();
                    }
                }
                None => break,
            }
        }
    }
}

/// A size-bounded least-recently-used byte cache.
#[derive(Debug, Clone)]
pub struct ByteLruCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl ByteLruCache {
    /// Create a cache with a total byte budget shared by all keyspaces.
    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                budget: budget_bytes,
                total: 0,
                clock: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Partition off a keyspace identified by a key prefix.
    pub fn keyspace(&self, prefix: impl Into<String>) -> Keyspace {
        Keyspace {
            prefix: prefix.into(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Total bytes currently held, across all keyspaces.
    pub fn total_bytes(&self) -> usize {
        self.lock().total
    }

    /// Number of entries currently held, across all keyspaces.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A named partition of a [`ByteLruCache`], identified by key prefix.
#[derive(Debug, Clone)]
pub struct Keyspace {
    prefix: String,
    inner: Arc<Mutex<CacheInner>>,
}

impl Keyspace {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert bytes under a key, evicting least-recently-used entries from
    /// the whole pool as needed. Returns `false` (and stores nothing) if
    /// the value alone exceeds the cache budget.
    pub fn insert(&self, key: &str, bytes: Vec<u8>) -> bool {
        let full = self.full_key(key);
        let mut inner = self.lock();

        if bytes.len() > inner.budget {
            return false;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let size = bytes.len();
        if let Some(previous) = inner.entries.insert(
            full,
            Entry {
                bytes,
                last_used: clock,
            },
        ) {
            inner.total -= previous.bytes.len();
        }
        inner.total += size;
        inner.evict_to_budget();
        true
    }

    /// Fetch a value, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let full = self.full_key(key);
        let mut inner = self.lock();
        inner.touch(&full);
        inner.entries.get(&full).map(|entry| entry.bytes.clone())
    }

    /// Whether a key is currently cached. Does not refresh recency.
    pub fn contains(&self, key: &str) -> bool {
        let full = self.full_key(key);
        self.lock().entries.contains_key(&full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyspaces_do_not_collide() {
        let cache = ByteLruCache::with_budget(MB);
        let resources = cache.keyspace("resources:");
        let generation = cache.keyspace("generation:");

        resources.insert("model", vec![1]);
        generation.insert("model", vec![2]);

        assert_eq!(resources.get("model"), Some(vec![1]));
        assert_eq!(generation.get("model"), Some(vec![2]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn eviction_spans_keyspaces() {
        let cache = ByteLruCache::with_budget(10);
        let a = cache.keyspace("a:");
        let b = cache.keyspace("b:");

        a.insert("x", vec![0; 6]);
        b.insert("y", vec![0; 6]);

        // Budget is 10, so the older entry (a:x) must have been evicted.
        assert!(!a.contains("x"));
        assert!(b.contains("y"));
        assert_eq!(cache.total_bytes(), 6);
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = ByteLruCache::with_budget(10);
        let ks = cache.keyspace("k:");

        ks.insert("old", vec![0; 4]);
        ks.insert("mid", vec![0; 4]);
        assert_eq!(ks.get("old"), Some(vec![0; 4]));

        // "mid" is now least recently used and should be evicted first.
        ks.insert("new", vec![0; 4]);
        assert!(ks.contains("old"));
        assert!(!ks.contains("mid"));
        assert!(ks.contains("new"));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let cache = ByteLruCache::with_budget(4);
        let ks = cache.keyspace("k:");
        assert!(!ks.insert("huge", vec![0; 5]));
        assert!(cache.is_empty());
    }

    #[test]
    fn replacing_a_key_updates_the_total() {
        let cache = ByteLruCache::with_budget(MB);
        let ks = cache.keyspace("k:");
        ks.insert("x", vec![0; 100]);
        ks.insert("x", vec![0; 10]);
        assert_eq!(cache.total_bytes(), 10);
        assert_eq!(cache.len(), 1);
    }
}
