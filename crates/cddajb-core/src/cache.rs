//! Bounded read-through cache.
//!
//! A fixed-capacity least-recently-used cache with hit/miss counters. All
//! state (entries, recency order, counters) sits behind one mutex, so `get`,
//! `put` and `clear` are never observed half-done.
//!
//! [`BoundedCache::get_or_compute`] runs the compute step outside the lock.
//! Concurrent misses on the same key may each compute; the last `put` wins.
//! A computed value is dropped instead of stored if the cache was cleared
//! while it was being computed, so nothing computed before a clear survives
//! it.
//!
//! The cache implements [`RebuildListener`] so a store can clear it when a
//! new snapshot is installed.

use crate::config::CacheConfig;
use crate::store::RebuildListener;
use crate::types::{CacheStats, RebuildSummary};
use lru::LruCache;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tracing::debug;

struct CacheInner<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    hits: u64,
    misses: u64,
    /// Bumped by every `clear`.
    epoch: u64,
}

/// Thread-safe LRU cache with hit/miss tracking.
///
/// ## Example
///
/// ```rust
/// use cddajb_core::BoundedCache;
///
/// let cache: BoundedCache<String, u32> = BoundedCache::new(2);
/// cache.put("a".to_string(), 1);
/// assert_eq!(cache.get("a"), Some(1));
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<CacheInner<K, V>>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        BoundedCache {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                epoch: 0,
            }),
            capacity: capacity.get(),
        }
    }

    /// Create a cache sized from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Look up a key, counting a hit or a miss.
    ///
    /// A hit promotes the key to most-recently-used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key).ok()
    }

    /// `get`, returning the current epoch on a miss.
    fn lookup<Q>(&self, key: &Q) -> Result<V, u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(key).cloned();
        match found {
            Some(value) => {
                inner.hits += 1;
                Ok(value)
            }
            None => {
                inner.misses += 1;
                Err(inner.epoch)
            }
        }
    }

    /// Insert or update a key, making it most-recently-used.
    ///
    /// At capacity, the least-recently-used entry is evicted first.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        Self::insert(&mut inner, key, value, self.capacity);
    }

    /// Store a value computed after a miss at `epoch`, unless a clear
    /// happened since.
    fn put_since(&self, key: K, value: V, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!("Cache cleared during compute, dropping result");
            return;
        }
        Self::insert(&mut inner, key, value, self.capacity);
    }

    fn insert(inner: &mut CacheInner<K, V>, key: K, value: V, capacity: usize) {
        if inner.entries.push(key, value).is_some() {
            debug!(capacity, "Cache entry replaced or evicted");
        }
    }

    /// Return the cached value or compute, store and return it.
    pub fn get_or_compute<Q, F>(&self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> V,
    {
        let epoch = match self.lookup(key) {
            Ok(value) => return value,
            Err(epoch) => epoch,
        };
        let value = compute();
        self.put_since(key.to_owned(), value.clone(), epoch);
        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but failures are
    /// returned to the caller and never cached.
    pub fn try_get_or_compute<Q, F, E>(&self, key: &Q, compute: F) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        let epoch = match self.lookup(key) {
            Ok(value) => return Ok(value),
            Err(epoch) => epoch,
        };
        let value = compute()?;
        self.put_since(key.to_owned(), value.clone(), epoch);
        Ok(value)
    }

    /// Capacity and counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.epoch += 1;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check presence without touching recency or counters.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().entries.contains(key)
    }
}

impl<K, V> RebuildListener for BoundedCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn on_rebuilt(&self, summary: &RebuildSummary) {
        debug!(blobs = summary.blobs, "Clearing response cache after rebuild");
        self.clear();
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.lock().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn key(i: usize) -> String {
        format!("/blobs/item/{i}")
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(4);
        assert_eq!(cache.get("/types"), None);
        cache.put("/types".to_string(), 7);
        assert_eq!(cache.get("/types"), Some(7));
        assert_eq!(cache.get("/types"), Some(7));

        assert_eq!(
            cache.stats(),
            CacheStats {
                capacity: 4,
                hits: 2,
                misses: 1
            }
        );
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache: BoundedCache<String, usize> = BoundedCache::new(3);
        for i in 0..4 {
            cache.put(key(i), i);
        }

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(key(0).as_str()));
        assert!(cache.contains(key(1).as_str()));
        assert!(cache.contains(key(3).as_str()));
    }

    #[test]
    fn test_get_promotes_before_eviction() {
        let cache: BoundedCache<String, usize> = BoundedCache::new(3);
        for i in 0..3 {
            cache.put(key(i), i);
        }
        assert_eq!(cache.get(key(0).as_str()), Some(0));

        cache.put(key(3), 3);

        assert!(cache.contains(key(0).as_str()));
        assert!(!cache.contains(key(1).as_str()));
    }

    #[test]
    fn test_put_existing_key_promotes() {
        let cache: BoundedCache<String, usize> = BoundedCache::new(2);
        cache.put(key(0), 0);
        cache.put(key(1), 1);
        cache.put(key(0), 10);
        cache.put(key(2), 2);

        assert_eq!(cache.get(key(0).as_str()), Some(10));
        assert!(!cache.contains(key(1).as_str()));
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache: BoundedCache<String, usize> = BoundedCache::new(2);
        cache.put(key(0), 0);
        cache.get(key(0).as_str());
        cache.get(key(1).as_str());

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rebuild_listener_clears() {
        let cache: BoundedCache<String, usize> = BoundedCache::new(2);
        cache.put(key(0), 0);
        cache.get(key(0).as_str());

        cache.on_rebuilt(&RebuildSummary::default());

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_get_or_compute() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(2);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        };

        assert_eq!(cache.get_or_compute("/search/axe", compute), 42);
        assert_eq!(cache.get_or_compute("/search/axe", compute), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_get_or_compute_does_not_cache_errors() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(2);

        let err: Result<u32, &str> = cache.try_get_or_compute("/blobs/x/y", || Err("not found"));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok: Result<u32, &str> = cache.try_get_or_compute("/blobs/x/y", || Ok(5));
        assert_eq!(ok, Ok(5));
        assert!(cache.contains("/blobs/x/y"));
    }

    #[test]
    fn test_clear_during_compute_drops_result() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(2);

        let value = cache.get_or_compute("/types", || {
            cache.clear();
            1
        });
        assert_eq!(value, 1);
        assert!(!cache.contains("/types"));

        let value: Result<u32, &str> = cache.try_get_or_compute("/types", || {
            cache.clear();
            Ok(2)
        });
        assert_eq!(value, Ok(2));
        assert!(cache.is_empty());

        // Without an intervening clear the next miss is stored as usual.
        assert_eq!(cache.get_or_compute("/types", || 3), 3);
        assert_eq!(cache.get("/types"), Some(3));
    }

    #[test]
    fn test_concurrent_access_stays_bounded() {
        let cache: Arc<BoundedCache<String, usize>> = Arc::new(BoundedCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        let k = key((t * 7 + i) % 40);
                        if cache.get(k.as_str()).is_none() {
                            cache.put(k, i);
                        }
                        if i % 50 == 0 {
                            cache.clear();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
    }
}
