//! Sharded Cache Module
//!
//! Splits one logical cache into N independently locked shards so that
//! writers on different keys rarely contend. A key always routes to the
//! same shard: the first byte of the SHA-1 digest of its `Display` form,
//! modulo the shard count.
//!
//! Whole-cache operations visit the shards one at a time, so `len`, `keys`
//! and `stats` are snapshots that may interleave with concurrent writes.

use std::fmt::{self, Display};
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::cache::{
    CacheStats, ConcurrentCache, EvictionList, OnEvict, SimpleLfu, SimpleLru, SyncCache,
};
use crate::error::{CacheError, Result};

/// Sharded LRU cache.
pub type HashLru<K, V> = HashCache<SimpleLru<K, V>>;

/// Sharded approximate LFU cache.
pub type HashLfu<K, V> = HashCache<SimpleLfu<K, V>>;

// == Hash Cache ==
/// A fixed set of [`SyncCache`] shards.
pub struct HashCache<P> {
    shards: Vec<SyncCache<P>>,
    size: AtomicUsize,
}

impl<P: EvictionList> HashCache<P> {
    // == Constructor ==
    /// Creates a sharded cache of `size` total entries.
    ///
    /// A `shard_count` of 0 uses the host's available parallelism. The count
    /// is clamped to `size` and each shard holds `ceil(size / shards)`.
    pub fn new(size: usize, shard_count: usize) -> Result<Self> {
        Self::build(size, shard_count, None)
    }

    /// Creates a sharded cache whose shards share one eviction callback.
    pub fn with_evict<F>(size: usize, shard_count: usize, on_evict: F) -> Result<Self>
    where
        F: Fn(&P::Key, &P::Value, i64) + Send + Sync + 'static,
    {
        Self::build(size, shard_count, Some(Arc::new(on_evict)))
    }

    fn build(
        size: usize,
        shard_count: usize,
        on_evict: Option<OnEvict<P::Key, P::Value>>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(CacheError::InvalidSize);
        }

        let requested = if shard_count == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            shard_count
        };
        let count = requested.min(size);
        let per_shard = size.div_ceil(count);

        let shards = (0..count)
            .map(|_| P::build(per_shard, on_evict.clone()).map(SyncCache::from_list))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Sharded cache created: {} shards of {} entries",
            count, per_shard
        );
        Ok(Self {
            shards,
            size: AtomicUsize::new(size),
        })
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Requested total capacity.
    pub fn capacity(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    // == Resize ==
    /// Sets a new total capacity, spread as `ceil(size / shards)` per shard.
    /// Returns the number of entries evicted across all shards.
    ///
    /// Each shard is resized under its own lock, one after another.
    pub fn resize(&self, size: usize) -> usize {
        let per_shard = size.div_ceil(self.shards.len());
        let evicted: usize = self
            .shards
            .iter()
            .map(|shard| shard.resize(per_shard))
            .sum();
        self.size.store(size.max(1), Ordering::Relaxed);
        evicted
    }

    // == Keys ==
    /// Interleaves each shard's keys position by position, so the first
    /// entry of the result is shard 0's oldest key, then shard 1's oldest.
    pub fn keys(&self) -> Vec<P::Key> {
        let per_shard: Vec<Vec<P::Key>> = self.shards.iter().map(SyncCache::keys).collect();
        let longest = per_shard.iter().map(Vec::len).max().unwrap_or(0);

        let mut keys = Vec::with_capacity(per_shard.iter().map(Vec::len).sum());
        for i in 0..longest {
            keys.extend(per_shard.iter().filter_map(|shard| shard.get(i).cloned()));
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(SyncCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(SyncCache::is_empty)
    }

    // == Purge ==
    pub fn purge(&self) {
        for shard in &self.shards {
            shard.purge();
        }
    }

    /// Removes expired entries from every shard. Returns the total removed.
    pub fn purge_overdue(&self) -> usize {
        self.shards.iter().map(SyncCache::purge_overdue).sum()
    }

    /// Sum of every shard's statistics.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for shard in &self.shards {
            total += shard.stats();
        }
        total
    }
}

impl<P> HashCache<P>
where
    P: EvictionList,
    P::Key: Display,
{
    // == Routing ==
    /// Index of the shard that owns `key`.
    pub fn shard_for(&self, key: &P::Key) -> usize {
        let digest = Sha1::digest(key.to_string().as_bytes());
        digest[0] as usize % self.shards.len()
    }

    fn shard(&self, key: &P::Key) -> &SyncCache<P> {
        &self.shards[self.shard_for(key)]
    }

    // == Add ==
    /// Adds a value to the owning shard. Returns true if that shard evicted.
    pub fn add(&self, key: P::Key, value: P::Value, expiration_time: i64) -> bool {
        self.shard(&key).add(key, value, expiration_time)
    }

    pub fn remove(&self, key: &P::Key) -> bool {
        self.shard(key).remove(key)
    }
}

impl<P> HashCache<P>
where
    P: EvictionList,
    P::Key: Display,
    P::Value: Clone,
{
    // == Lookups ==
    pub fn get(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        self.shard(key).get(key)
    }

    pub fn peek(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        self.shard(key).peek(key)
    }

    pub fn contains(&self, key: &P::Key) -> bool {
        self.shard(key).contains(key)
    }

    /// Atomic within the owning shard. Returns `(found, evicted)`.
    pub fn contains_or_add(
        &self,
        key: P::Key,
        value: P::Value,
        expiration_time: i64,
    ) -> (bool, bool) {
        self.shard(&key).contains_or_add(key, value, expiration_time)
    }

    /// Atomic within the owning shard. Returns `(previous, evicted)`.
    pub fn peek_or_add(
        &self,
        key: P::Key,
        value: P::Value,
        expiration_time: i64,
    ) -> (Option<(P::Value, i64)>, bool) {
        self.shard(&key).peek_or_add(key, value, expiration_time)
    }
}

impl<K, V> HashCache<SimpleLfu<K, V>>
where
    K: Eq + Hash + Clone,
{
    // == Resize Weight ==
    /// Scales weights in every shard.
    pub fn resize_weight(&self, percentage: u32) {
        for shard in &self.shards {
            shard.resize_weight(percentage);
        }
    }
}

impl<K, V> HashCache<SimpleLfu<K, V>>
where
    K: Eq + Hash + Clone + Display,
{
    /// Current weight of `key` in its owning shard, without touching it.
    pub fn weight(&self, key: &K) -> Option<u64> {
        self.shard(key).weight(key)
    }
}

impl<P> ConcurrentCache<P::Key, P::Value> for HashCache<P>
where
    P: EvictionList + Send + Sync,
    P::Key: Display,
    P::Value: Clone,
{
    fn add(&self, key: P::Key, value: P::Value, expiration_time: i64) -> bool {
        HashCache::add(self, key, value, expiration_time)
    }

    fn get(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        HashCache::get(self, key)
    }

    fn peek(&self, key: &P::Key) -> Option<(P::Value, i64)> {
        HashCache::peek(self, key)
    }

    fn contains(&self, key: &P::Key) -> bool {
        HashCache::contains(self, key)
    }

    fn remove(&self, key: &P::Key) -> bool {
        HashCache::remove(self, key)
    }

    fn keys(&self) -> Vec<P::Key> {
        HashCache::keys(self)
    }

    fn len(&self) -> usize {
        HashCache::len(self)
    }

    fn purge(&self) {
        HashCache::purge(self)
    }

    fn purge_overdue(&self) -> usize {
        HashCache::purge_overdue(self)
    }

    fn stats(&self) -> CacheStats {
        HashCache::stats(self)
    }
}

impl<P: EvictionList + fmt::Debug> fmt::Debug for HashCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashCache")
            .field("size", &self.capacity())
            .field("shards", &self.shards)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::now_ms;
    use std::collections::HashSet;

    #[test]
    fn test_hash_zero_size_rejected() {
        assert_eq!(
            HashLru::<String, i32>::new(0, 4).unwrap_err(),
            CacheError::InvalidSize
        );
    }

    #[test]
    fn test_hash_shard_count_clamped_to_size() {
        let cache = HashLru::<u32, u32>::new(3, 16).unwrap();
        assert_eq!(cache.shard_count(), 3);

        let cache = HashLru::<u32, u32>::new(100, 0).unwrap();
        assert!(cache.shard_count() >= 1);
    }

    #[test]
    fn test_hash_routing_is_stable() {
        let cache = HashLru::<String, i32>::new(64, 8).unwrap();
        let key = "user:42".to_string();

        let shard = cache.shard_for(&key);
        assert!(shard < 8);
        for _ in 0..10 {
            assert_eq!(cache.shard_for(&key), shard);
        }
    }

    #[test]
    fn test_hash_add_get_round_trip() {
        let cache = HashLru::new(64, 4).unwrap();
        for i in 0..10u32 {
            cache.add(i, i * 10, 0);
        }

        assert_eq!(cache.len(), 10);
        for i in 0..10u32 {
            assert_eq!(cache.get(&i), Some((i * 10, 0)));
        }
        assert_eq!(cache.stats().hits, 10);
    }

    #[test]
    fn test_hash_keys_interleave_all_shards() {
        let cache = HashLru::new(128, 4).unwrap();
        for i in 0..20u32 {
            cache.add(i, (), 0);
        }

        let mut keys = cache.keys();
        assert_eq!(keys.len(), 20);
        keys.sort_unstable();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_hash_keys_with_single_shard_preserve_order() {
        let cache = HashLru::new(8, 1).unwrap();
        cache.add("a", 1, 0);
        cache.add("b", 2, 0);
        cache.add("c", 3, 0);

        assert_eq!(cache.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_hash_contains_or_add() {
        let cache = HashLfu::new(16, 2).unwrap();

        assert_eq!(cache.contains_or_add("k", 1, 0), (false, false));
        assert_eq!(cache.contains_or_add("k", 2, 0), (true, false));
        assert_eq!(cache.peek_or_add("k", 3, 0), (Some((1, 0)), false));
        assert_eq!(cache.peek(&"k"), Some((1, 0)));
    }

    #[test]
    fn test_hash_purge_and_purge_overdue() {
        let cache = HashLru::new(32, 4).unwrap();
        for i in 0..8u32 {
            let exp = if i % 2 == 0 { now_ms() - 100 } else { 0 };
            cache.add(i, i, exp);
        }

        assert_eq!(cache.purge_overdue(), 4);
        assert_eq!(cache.len(), 4);

        cache.purge();
        assert!(cache.is_empty());
        cache.purge();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_hash_resize_returns_total_evicted() {
        let cache = Arc::new(HashLru::new(256, 4).unwrap());
        for i in 0..40u32 {
            cache.add(i, i, 0);
        }
        let before: Vec<usize> = cache.shards.iter().map(SyncCache::len).collect();
        assert_eq!(before.iter().sum::<usize>(), 40);
        assert!(before.iter().filter(|&&len| len > 2).count() > 1);

        // Shared handle: resize goes through &self
        let shared = cache.clone();
        let expected: usize = before.iter().map(|len| len.saturating_sub(2)).sum();
        assert_eq!(shared.resize(8), expected);

        let after: Vec<usize> = cache.shards.iter().map(SyncCache::len).collect();
        let kept: Vec<usize> = before.iter().map(|&len| len.min(2)).collect();
        assert_eq!(after, kept);
        assert_eq!(cache.len(), 40 - expected);
        assert_eq!(cache.capacity(), 8);
        assert!(cache.shards.iter().all(|shard| shard.capacity() == 2));

        assert_eq!(cache.resize(64), 0);
        assert!(cache.shards.iter().all(|shard| shard.capacity() == 16));
    }

    #[test]
    fn test_hash_callback_shared_by_shards() {
        let evicted = Arc::new(AtomicUsize::new(0));
        let counter = evicted.clone();
        let cache = HashLru::with_evict(4, 2, move |_: &u32, _: &u32, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for i in 0..4u32 {
            cache.add(i, i, 0);
        }
        cache.purge();

        assert_eq!(evicted.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_hash_lfu_resize_weight_reaches_every_shard() {
        let cache = HashLfu::new(256, 4).unwrap();
        for i in 0..32u32 {
            cache.add(i, i, 0);
            for _ in 0..(i % 4) * 2 {
                cache.get(&i);
            }
        }
        let shards: HashSet<usize> = (0..32u32).map(|i| cache.shard_for(&i)).collect();
        assert!(shards.len() > 1);

        cache.resize_weight(50);

        for i in 0..32u32 {
            let weight = 1 + u64::from(i % 4) * 2;
            assert_eq!(cache.weight(&i), Some(weight * 50 / 100), "key {i}");
        }
        assert_eq!(cache.weight(&99), None);
    }
}
