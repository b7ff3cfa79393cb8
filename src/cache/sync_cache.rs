//! Locked Cache Module
//!
//! Thread-safe façade over one eviction list, guarded by a single
//! `parking_lot::RwLock`.
//!
//! Mutating calls take the write lock. That includes `get`, because a hit
//! refreshes recency or bumps weight. `peek`, `contains`, `keys`, `len` and
//! `stats` take the read lock. When a read-locked `peek`/`contains` runs into
//! an expired entry, it retries under the write lock so the entry is dropped
//! as a side effect.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{
    CacheStats, ConcurrentCache, EvictionList, Probe, SimpleLfu, SimpleLru,
};
use crate::error::Result;

/// Thread-safe LRU cache.
pub type LruCache<K, V> = SyncCache<SimpleLru<K, V>>;

/// Thread-safe approximate LFU cache.
pub type LfuCache<K, V> = SyncCache<SimpleLfu<K, V>>;

struct Guarded<P> {
    list: P,
    stats: CacheStats,
}

// == Sync Cache ==
/// One eviction list behind one read/write lock.
///
/// # Example
/// ```
/// use mcache::LruCache;
///
/// let cache = LruCache::new(2).unwrap();
/// cache.add("a", 1, 0);
/// cache.add("b", 2, 0);
/// cache.get(&"a");
/// cache.add("c", 3, 0);
///
/// assert!(cache.contains(&"a"));
/// assert!(!cache.contains(&"b"));
/// ```
pub struct SyncCache<P> {
    inner: RwLock<Guarded<P>>,
}

impl<P: EvictionList> SyncCache<P> {
    // == Constructor ==
    /// Creates a cache holding at most `size` entries.
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self::from_list(P::build(size, None)?))
    }

    /// Creates a cache that calls `on_evict` whenever an entry leaves it.
    ///
    /// The callback runs while the cache lock is held and must not call back
    /// into this cache.
    pub fn with_evict<F>(size: usize, on_evict: F) -> Result<Self>
    where
        F: Fn(&P::Key, &P::Value, i64) + Send + Sync + 'static,
    {
        Ok(Self::from_list(P::build(size, Some(Arc::new(on_evict)))?))
    }

    /// Wraps an existing list.
    pub fn from_list(list: P) -> Self {
        Self {
            inner: RwLock::new(Guarded {
                list,
                stats: CacheStats::new(),
            }),
        }
    }

    // == Add ==
    /// Adds a value to the cache. Returns true if an eviction occurred.
    pub fn add(&self, key: P::Key, value: P::Value, expiration_time: i64) -> bool {
        let mut guard = self.inner.write();
        let evicted = guard.list.add(key, value, expiration_time);
        guard.stats.record_insert(evicted);
        evicted
    }

    // == Remove ==
    /// Removes the provided key. Returns whether it was present.
    pub fn remove(&self, key: &P::Key) -> bool {
        self.inner.write().list.remove(key)
    }

    // == Keys ==
    /// Returns the keys from oldest to newest.
    pub fn keys(&self) -> Vec<P::Key> {
        self.inner.read().list.keys()
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until
    /// they are touched or purged.
    pub fn len(&self) -> usize {
        self.inner.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().list.capacity()
    }

    // == Purge ==
    /// Clears the cache, invoking the eviction callback per entry.
    pub fn purge(&self) {
        self.inner.write().list.purge();
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn purge_overdue(&self) -> usize {
        self.inner.write().list.purge_overdue()
    }

    // == Resize ==
    /// Changes the capacity. Returns the number of entries evicted.
    pub fn resize(&self, size: usize) -> usize {
        self.inner.write().list.resize(size)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.read();
        let mut stats = guard.stats.clone();
        stats.set_total_entries(guard.list.len());
        stats
    }
}

impl<P> SyncCache<P>
where
    P: EvictionList,
    P::Value: Clone,
{
    // == Get ==
    /// Looks up a key, refreshing its recency or weight.
    pub fn get(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        let mut guard = self.inner.write();
        let Guarded { list, stats } = &mut *guard;
        let found = list.get(key).map(|(value, exp)| (value.clone(), exp));
        stats.record_lookup(found.is_some());
        found
    }

    // == Peek ==
    /// Looks up a key without refreshing it.
    pub fn peek(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        match self.inner.read().list.probe(key) {
            Probe::Live(value, exp) => return Some((value.clone(), exp)),
            Probe::Absent => return None,
            Probe::Stale => {}
        }
        self.inner
            .write()
            .list
            .peek(key)
            .map(|(value, exp)| (value.clone(), exp))
    }

    // == Contains ==
    /// Checks if a key is in the cache without refreshing it.
    pub fn contains(&self, key: &P::Key) -> bool {
        match self.inner.read().list.probe(key) {
            Probe::Live(..) => return true,
            Probe::Absent => return false,
            Probe::Stale => {}
        }
        self.inner.write().list.contains(key)
    }

    // == Contains Or Add ==
    /// Adds the value only if the key is absent, as one atomic step.
    ///
    /// Returns `(found, evicted)`.
    pub fn contains_or_add(
        &self,
        key: P::Key,
        value: P::Value,
        expiration_time: i64,
    ) -> (bool, bool) {
        let mut guard = self.inner.write();
        if guard.list.contains(&key) {
            return (true, false);
        }
        let evicted = guard.list.add(key, value, expiration_time);
        guard.stats.record_insert(evicted);
        (false, evicted)
    }

    // == Peek Or Add ==
    /// Returns the current value if present, otherwise adds the given one,
    /// as one atomic step.
    ///
    /// Returns `(previous, evicted)`.
    pub fn peek_or_add(
        &self,
        key: P::Key,
        value: P::Value,
        expiration_time: i64,
    ) -> (Option<(P::Value, i64)>, bool) {
        let mut guard = self.inner.write();
        let previous = guard
            .list
            .peek(&key)
            .map(|(value, exp)| (value.clone(), exp));
        if previous.is_some() {
            return (previous, false);
        }
        let evicted = guard.list.add(key, value, expiration_time);
        guard.stats.record_insert(evicted);
        (None, evicted)
    }

    // == Oldest ==
    /// Removes and returns the oldest live entry.
    pub fn remove_oldest(&self) -> Option<(P::Key, P::Value, i64)> {
        self.inner.write().list.remove_oldest()
    }

    /// Returns the oldest live entry without removing it.
    pub fn get_oldest(&self) -> Option<(P::Key, P::Value, i64)> {
        self.inner
            .write()
            .list
            .get_oldest()
            .map(|(key, value, exp)| (key.clone(), value.clone(), exp))
    }
}

impl<K, V> SyncCache<SimpleLfu<K, V>>
where
    K: Eq + Hash + Clone,
{
    // == Resize Weight ==
    /// Scales every entry's weight to `weight * percentage / 100`.
    pub fn resize_weight(&self, percentage: u32) {
        self.inner.write().list.resize_weight(percentage);
    }

    /// Returns the current weight of `key` without touching it.
    pub fn weight(&self, key: &K) -> Option<u64> {
        self.inner.read().list.weight(key)
    }
}

impl<P> ConcurrentCache<P::Key, P::Value> for SyncCache<P>
where
    P: EvictionList + Send + Sync,
    P::Value: Clone,
{
    fn add(&self, key: P::Key, value: P::Value, expiration_time: i64) -> bool {
        SyncCache::add(self, key, value, expiration_time)
    }

    fn get(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        SyncCache::get(self, key)
    }

    fn peek(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        SyncCache::peek(self, key)
    }

    fn contains(&self, key: &P::Key) -> bool {
        SyncCache::contains(self, key)
    }

    fn remove(&self, key: &P::Key) -> bool {
        SyncCache::remove(self, key)
    }

    fn keys(&self) -> Vec<P::Key> {
        SyncCache::keys(self)
    }

    fn len(&self) -> usize {
        SyncCache::len(self)
    }

    fn purge(&self) {
        SyncCache::purge(self)
    }

    fn purge_overdue(&self) -> usize {
        SyncCache::purge_overdue(self)
    }

    fn stats(&self) -> CacheStats {
        SyncCache::stats(self)
    }
}

impl<P: EvictionList + fmt::Debug> fmt::Debug for SyncCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCache")
            .field("list", &self.inner.read().list)
            .finish()
    }
}
