//! Thread-safe LRU cache of lookup outcomes
//!
//! Both positive and negative results are cached so that repeated queries
//! for unmapped addresses skip the search as well. Every `get` updates
//! recency, so the cache serializes access with its own mutex; hit and
//! miss counters are atomics readable without taking it.

use crate::config::DEFAULT_CACHE_SIZE;
use lru::LruCache;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type FxLru = LruCache<u32, CacheEntry, BuildHasherDefault<FxHasher>>;

/// A cached lookup outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The address resolved to this country code
    Found(Arc<str>),
    /// The address is known to have no match
    Missing,
}

impl CacheEntry {
    /// Whether this records a successful resolution
    pub fn is_found(&self) -> bool {
        matches!(self, CacheEntry::Found(_))
    }

    /// The cached code, if any
    pub fn code(&self) -> Option<&Arc<str>> {
        match self {
            CacheEntry::Found(code) => Some(code),
            CacheEntry::Missing => None,
        }
    }
}

impl From<Option<Arc<str>>> for CacheEntry {
    fn from(code: Option<Arc<str>>) -> Self {
        match code {
            Some(code) => CacheEntry::Found(code),
            None => CacheEntry::Missing,
        }
    }
}

/// Fixed-capacity LRU cache keyed by numeric IPv4 address
pub struct LookupCache {
    inner: Mutex<FxLru>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LookupCache {
    /// Create a cache holding at most `capacity` entries
    ///
    /// A capacity of 0 is replaced by the default (1000).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN));
        Self {
            inner: Mutex::new(LruCache::with_hasher(capacity, BuildHasherDefault::default())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FxLru> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a cached outcome, promoting it to most-recently-used
    pub fn get(&self, ip: u32) -> Option<CacheEntry> {
        let mut cache = self.lock();
        match cache.get(&ip) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or update an outcome
    ///
    /// Updating an existing key promotes it without growing the cache;
    /// inserting into a full cache evicts the least-recently-used entry.
    pub fn put(&self, ip: u32, entry: CacheEntry) {
        self.lock().put(ip, entry);
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        let mut cache = self.lock();
        cache.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// `(hits, misses)` since construction or the last [`clear`](Self::clear)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hits, misses) = self.stats();
        f.debug_struct("LookupCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("hits", &hits)
            .field("misses", &misses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn found(code: &str) -> CacheEntry {
        CacheEntry::Found(Arc::from(code))
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let cache = LookupCache::new(4);
        assert_eq!(cache.get(1), None);
        cache.put(1, found("US"));
        assert_eq!(cache.get(1), Some(found("US")));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_eviction_order() {
        let cache = LookupCache::new(2);
        cache.put(1, found("A"));
        cache.put(2, found("B"));
        cache.put(3, found("C"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some(found("B")));
        assert_eq!(cache.get(3), Some(found("C")));
    }

    #[test]
    fn test_get_promotes_recency() {
        let cache = LookupCache::new(2);
        cache.put(1, found("A"));
        cache.put(2, found("B"));
        assert!(cache.get(1).is_some());
        cache.put(3, found("C"));

        // 2 was least recently used once 1 was read
        assert_eq!(cache.get(2), None);
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn test_update_does_not_grow() {
        let cache = LookupCache::new(2);
        cache.put(1, found("A"));
        cache.put(2, found("B"));
        cache.put(1, found("Z"));
        assert_eq!(cache.len(), 2);

        cache.put(3, found("C"));
        // updating 1 promoted it, so 2 was evicted
        assert_eq!(cache.get(1), Some(found("Z")));
        assert_eq!(cache.get(2), None);
    }

    #[test]
    fn test_negative_entries() {
        let cache = LookupCache::new(2);
        cache.put(9, CacheEntry::Missing);
        let entry = cache.get(9).unwrap();
        assert!(!entry.is_found());
        assert_eq!(entry.code(), None);
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache = LookupCache::new(2);
        cache.put(1, found("A"));
        cache.get(1);
        cache.get(2);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats(), (0, 0));
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(LookupCache::new(0).capacity(), DEFAULT_CACHE_SIZE);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(LookupCache::new(64));
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1000u32 {
                        let key = (t * 1000 + i) % 128;
                        if cache.get(key).is_none() {
                            cache.put(key, CacheEntry::Missing);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (hits, misses) = cache.stats();
        assert_eq!(hits + misses, 8000);
        assert!(cache.len() <= 64);
    }
}
