//! Bounded key-value cache with a pluggable eviction policy.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::Ordering;

use tracing::trace;

use crate::cache::policy::{EvictionPolicy, LruPolicy, RandomPolicy};
use crate::cache::CacheStats;
use crate::common::{Error, Result};

/// A bounded associative store.
///
/// # Bookkeeping
/// ```text
/// order:  [ oldest ... newest ]   VecDeque<K>, touched keys move to the back
/// data:   K -> V                  HashMap
/// policy: picks a position in `order` when a new key needs room
/// ```
///
/// Only inserting a *new* key at capacity evicts. Overwriting an existing
/// key replaces the value and marks it most recent, without evicting.
/// A hit on [`Cache::retrieve`] re-stores the value, so it also becomes
/// most recent. Misses have no side effect besides the counter.
///
/// The cache is not internally synchronized; owners wrap it in a lock.
pub struct Cache<K, V> {
    max_size: usize,
    order: VecDeque<K>,
    data: HashMap<K, V>,
    policy: Box<dyn EvictionPolicy<K>>,
    stats: CacheStats,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a cache holding at most `max_size` entries.
    ///
    /// # Errors
    /// `Error::InvalidCacheSize` if `max_size` is 0.
    pub fn new(max_size: usize, policy: Box<dyn EvictionPolicy<K>>) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::InvalidCacheSize(max_size));
        }
        Ok(Self {
            max_size,
            order: VecDeque::with_capacity(max_size),
            data: HashMap::with_capacity(max_size),
            policy,
            stats: CacheStats::new(),
        })
    }

    /// Least-recently-used cache.
    pub fn lru(max_size: usize) -> Result<Self> {
        Self::new(max_size, Box::new(LruPolicy::new()))
    }

    /// Random-replacement cache.
    pub fn random(max_size: usize) -> Result<Self> {
        Self::new(max_size, Box::new(RandomPolicy::new()))
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn has(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Store `value` under `key`.
    pub fn store(&mut self, key: K, value: V) {
        if self.data.contains_key(&key) {
            self.touch(&key);
            self.data.insert(key, value);
            return;
        }

        while self.order.len() >= self.max_size {
            let Some(pos) = self.policy.select_victim(&self.order) else {
                break;
            };
            if let Some(victim) = self.order.remove(pos) {
                trace!(policy = self.policy.name(), key = ?victim, "cache eviction");
                self.data.remove(&victim);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.order.push_back(key.clone());
        self.data.insert(key, value);
    }

    /// Fetch a copy of the value for `key`, counting a hit or a miss.
    pub fn retrieve(&mut self, key: &K) -> Option<V> {
        match self.data.get(key) {
            Some(value) => {
                let value = value.clone();
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                self.touch(key);
                Some(value)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Remove `key`. Returns the cached value if there was one.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        let value = self.data.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    /// Drop all entries, keeping the counters.
    pub fn truncate(&mut self) {
        self.order.clear();
        self.data.clear();
    }

    /// Drop all entries and reset the counters.
    pub fn flush(&mut self) {
        self.truncate();
        self.stats.reset();
    }

    /// Keys from least to most recently touched.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Cached values, in recency order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|k| self.data.get(k))
    }

    /// A copy of the cached contents.
    pub fn to_map(&self) -> HashMap<K, V> {
        self.data.clone()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("policy", &self.policy.name())
            .field("max_size", &self.max_size)
            .field("keys", &self.order)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lru(size: usize) -> Cache<&'static str, u32> {
        Cache::lru(size).unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        let result: Result<Cache<u32, u32>> = Cache::lru(0);
        assert!(matches!(result, Err(Error::InvalidCacheSize(0))));
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let mut cache = lru(2);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.store("c", 3);

        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
        assert_eq!(cache.stats().snapshot().evictions, 1);
    }

    #[test]
    fn test_lru_retrieve_protects_key() {
        let mut cache = lru(2);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.store("c", 3);

        // b becomes most recent, so c is the oldest now
        assert_eq!(cache.retrieve(&"b"), Some(2));
        cache.store("d", 4);

        assert!(cache.has(&"b"));
        assert!(!cache.has(&"c"));
        assert!(cache.has(&"d"));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = lru(2);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.store("a", 10);

        assert_eq!(cache.size(), 2);
        assert!(cache.has(&"b"));
        assert_eq!(cache.retrieve(&"a"), Some(10));
        assert_eq!(cache.stats().snapshot().evictions, 0);
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let mut cache = lru(4);
        cache.store("a", 1);

        assert_eq!(cache.retrieve(&"a"), Some(1));
        assert_eq!(cache.retrieve(&"zz"), None);
        assert_eq!(cache.retrieve(&"zz"), None);

        let snap = cache.stats().snapshot();
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 2);
        // A miss leaves the contents untouched
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_truncate_keeps_counters_flush_resets() {
        let mut cache = lru(4);
        cache.store("a", 1);
        cache.retrieve(&"a");

        cache.truncate();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().snapshot().hits, 1);

        cache.store("a", 1);
        cache.flush();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().snapshot().hits, 0);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = lru(4);
        cache.store("a", 1);
        cache.store("b", 2);

        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert_eq!(cache.invalidate(&"a"), None);
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_values_in_recency_order() {
        let mut cache = lru(4);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.retrieve(&"a");

        assert_eq!(cache.values().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(cache.to_map().len(), 2);
    }

    #[test]
    fn test_random_evicts_existing_key() {
        let mut cache: Cache<u32, u32> =
            Cache::new(2, Box::new(RandomPolicy::with_seed(3))).unwrap();
        cache.store(1, 1);
        cache.store(2, 2);
        cache.store(3, 3);

        assert_eq!(cache.size(), 2);
        assert!(cache.has(&3));
        // Exactly one of the previous keys survived
        assert!(cache.has(&1) ^ cache.has(&2));
    }

    #[test]
    fn test_random_size_invariant() {
        let mut cache: Cache<u32, u32> =
            Cache::new(3, Box::new(RandomPolicy::with_seed(11))).unwrap();
        for i in 0..50 {
            cache.store(i % 7, i);
            assert!(cache.size() <= cache.max_size());
        }
    }
}
