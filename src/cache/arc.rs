//! Adaptive Replacement Cache Module
//!
//! ARC tracks both recency and frequency. It keeps four lists under one lock:
//!
//! ```text
//!   T1  recent entries          (SimpleLru, holds values)
//!   B1  ghosts evicted from T1  (SimpleLru, keys + expiry only)
//!   T2  frequent entries        (SimpleLfu, holds values)
//!   B2  ghosts evicted from T2  (SimpleLfu, keys + expiry only)
//! ```
//!
//! A key lives in at most one list. `p` is the target size of T1: a hit in
//! B1 means recency was undervalued and grows `p`, a hit in B2 shrinks it.
//! `replace` then uses `p` to choose which side gives up an entry.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::cache::{
    CacheStats, ConcurrentCache, EvictionList, OnEvict, Probe, SimpleLfu, SimpleLru,
};
use crate::error::{CacheError, Result};

struct ArcState<K, V> {
    size: usize,
    p: usize,
    t1: SimpleLru<K, V>,
    b1: SimpleLru<K, ()>,
    t2: SimpleLfu<K, V>,
    b2: SimpleLfu<K, ()>,
    stats: CacheStats,
}

// == ARC Cache ==
/// Thread-safe fixed size Adaptive Replacement Cache.
pub struct ArcCache<K, V> {
    state: RwLock<ArcState<K, V>>,
}

impl<K, V> ArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an ARC holding at most `size` values.
    pub fn new(size: usize) -> Result<Self> {
        Self::build(size, None)
    }

    /// Creates an ARC that calls `on_evict` whenever a value leaves the
    /// cache: demotion to a ghost list, removal, purge or expiry. Moving an
    /// entry from T1 to T2 is not an eviction.
    pub fn with_evict<F>(size: usize, on_evict: F) -> Result<Self>
    where
        F: Fn(&K, &V, i64) + Send + Sync + 'static,
    {
        Self::build(size, Some(Arc::new(on_evict)))
    }

    fn build(size: usize, on_evict: Option<OnEvict<K, V>>) -> Result<Self> {
        if size == 0 {
            return Err(CacheError::InvalidSize);
        }
        let state = ArcState {
            size,
            p: 0,
            t1: SimpleLru::build(size, on_evict.clone())?,
            b1: SimpleLru::new(size)?,
            t2: SimpleLfu::build(size, on_evict)?,
            b2: SimpleLfu::new(size)?,
            stats: CacheStats::new(),
        };
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    // == Add ==
    /// Adds a value, adapting `p` when the key is found in a ghost list.
    /// Returns `true` if another entry was demoted to make room.
    pub fn add(&self, key: K, value: V, expiration_time: i64) -> bool {
        let mut state = self.state.write();

        // Recent hit graduates to the frequent list
        if state.t1.contains(&key) {
            state.t1.take(&key);
            state.t2.add(key, value, expiration_time);
            return false;
        }

        if state.t2.contains(&key) {
            state.t2.add(key, value, expiration_time);
            return false;
        }

        // Recently evicted from T1: T1 is too small, grow p
        if state.b1.contains(&key) {
            let (b1_len, b2_len) = (state.b1.len(), state.b2.len());
            let delta = if b2_len > b1_len { b2_len / b1_len } else { 1 };
            state.p = (state.p + delta).min(state.size);
            trace!("ARC ghost hit in B1, p raised to {}", state.p);

            let demoted = state.t1.len() + state.t2.len() >= state.size && state.replace(false);
            state.b1.remove(&key);
            state.t2.add(key, value, expiration_time);
            return demoted;
        }

        // Recently evicted from T2: T2 is too small, shrink p
        if state.b2.contains(&key) {
            let (b1_len, b2_len) = (state.b1.len(), state.b2.len());
            let delta = if b1_len > b2_len { b1_len / b2_len } else { 1 };
            state.p = state.p.saturating_sub(delta);
            trace!("ARC ghost hit in B2, p lowered to {}", state.p);

            let demoted = state.t1.len() + state.t2.len() >= state.size && state.replace(true);
            state.b2.remove(&key);
            state.t2.add(key, value, expiration_time);
            return demoted;
        }

        let demoted = state.t1.len() + state.t2.len() >= state.size && state.replace(false);

        // Keep the ghost lists bounded
        let b1_limit = state.size - state.p;
        while state.b1.len() > b1_limit && state.b1.remove_oldest().is_some() {}
        let b2_limit = state.p;
        while state.b2.len() > b2_limit && state.b2.remove_oldest().is_some() {}

        state.t1.add(key, value, expiration_time);
        demoted
    }

    // == Remove ==
    /// Removes the key from whichever list holds it. Returns whether a
    /// cached value was dropped.
    pub fn remove(&self, key: &K) -> bool {
        let mut state = self.state.write();
        if state.t1.remove(key) || state.t2.remove(key) {
            return true;
        }
        if !state.b1.remove(key) {
            state.b2.remove(key);
        }
        false
    }

    // == Keys ==
    /// Returns T1 keys (oldest to newest) followed by T2 keys.
    pub fn keys(&self) -> Vec<K> {
        let state = self.state.read();
        let mut keys = state.t1.keys();
        keys.extend(state.t2.keys());
        keys
    }

    // == Length ==
    /// Returns the number of cached values (|T1| + |T2|).
    pub fn len(&self) -> usize {
        let state = self.state.read();
        state.t1.len() + state.t2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Purge ==
    pub fn purge(&self) {
        let mut state = self.state.write();
        state.t1.purge();
        state.t2.purge();
        state.b1.purge();
        state.b2.purge();
    }

    /// Removes expired entries from all four lists. Returns how many cached
    /// values were dropped; expired ghosts are cleared but not counted.
    pub fn purge_overdue(&self) -> usize {
        let mut state = self.state.write();
        let removed = state.t1.purge_overdue() + state.t2.purge_overdue();
        state.b1.purge_overdue();
        state.b2.purge_overdue();
        removed
    }

    // == Resize Weight ==
    /// Scales weights on the frequency side (T2 and B2).
    pub fn resize_weight(&self, percentage: u32) {
        let mut state = self.state.write();
        state.t2.resize_weight(percentage);
        state.b2.resize_weight(percentage);
    }

    /// Weight of `key` on the frequency side (T2, or its ghost in B2).
    /// Entries in T1 and B1 carry no weight and report `None`.
    pub fn weight(&self, key: &K) -> Option<u64> {
        let state = self.state.read();
        state.t2.weight(key).or_else(|| state.b2.weight(key))
    }

    // == Introspection ==
    /// Current target size of T1.
    pub fn recent_target(&self) -> usize {
        self.state.read().p
    }

    /// Lengths of the ghost lists as `(|B1|, |B2|)`.
    pub fn ghost_len(&self) -> (usize, usize) {
        let state = self.state.read();
        (state.b1.len(), state.b2.len())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.t1.len() + state.t2.len());
        stats
    }

    /// Asserts that the four lists are pairwise disjoint and `p` is in range.
    ///
    /// # Panics
    /// Panics when an invariant does not hold.
    #[doc(hidden)]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.read();
        assert!(state.p <= state.size, "p {} exceeds size {}", state.p, state.size);
        assert!(state.t1.len() + state.t2.len() <= state.size);

        let lists = [
            state.t1.keys(),
            state.b1.keys(),
            state.t2.keys(),
            state.b2.keys(),
        ];
        let mut seen = std::collections::HashSet::new();
        for key in lists.iter().flatten() {
            assert!(seen.insert(key), "key present in more than one ARC list");
        }
    }

    /// Lists `key` lives in, for tests and debugging: `"T1"`, `"T2"`, `"B1"`
    /// or `"B2"`.
    #[doc(hidden)]
    pub fn location(&self, key: &K) -> Option<&'static str> {
        let state = self.state.read();
        if !matches!(state.t1.probe(key), Probe::Absent) {
            Some("T1")
        } else if !matches!(state.t2.probe(key), Probe::Absent) {
            Some("T2")
        } else if !matches!(state.b1.probe(key), Probe::Absent) {
            Some("B1")
        } else if !matches!(state.b2.probe(key), Probe::Absent) {
            Some("B2")
        } else {
            None
        }
    }
}

impl<K, V> ArcCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Get ==
    /// Looks up a key. A hit in T1 promotes the entry to T2.
    pub fn get(&self, key: &K) -> Option<(V, i64)> {
        let mut state = self.state.write();

        let found = if state.t1.contains(key) {
            state.t1.take(key).map(|(value, exp)| {
                state.t2.add(key.clone(), value.clone(), exp);
                (value, exp)
            })
        } else {
            state.t2.get(key).map(|(value, exp)| (value.clone(), exp))
        };

        state.stats.record_lookup(found.is_some());
        found
    }

    // == Peek ==
    /// Looks up a key without promoting or touching it.
    pub fn peek(&self, key: &K) -> Option<(V, i64)> {
        {
            let state = self.state.read();
            match (state.t1.probe(key), state.t2.probe(key)) {
                (Probe::Live(value, exp), _) | (_, Probe::Live(value, exp)) => {
                    return Some((value.clone(), exp));
                }
                (Probe::Absent, Probe::Absent) => return None,
                _ => {}
            }
        }

        let mut state = self.state.write();
        if let Some((value, exp)) = state.t1.peek(key) {
            return Some((value.clone(), exp));
        }
        state.t2.peek(key).map(|(value, exp)| (value.clone(), exp))
    }

    // == Contains ==
    /// Checks if the key holds a cached value, without touching it.
    pub fn contains(&self, key: &K) -> bool {
        {
            let state = self.state.read();
            match (state.t1.probe(key), state.t2.probe(key)) {
                (Probe::Live(..), _) | (_, Probe::Live(..)) => return true,
                (Probe::Absent, Probe::Absent) => return false,
                _ => {}
            }
        }

        let mut state = self.state.write();
        state.t1.contains(key) || state.t2.contains(key)
    }
}

impl<K, V> ArcState<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Demotes one entry to its ghost list, choosing the side by `p`. Falls
    /// back to T1 when T2 is empty. Returns whether an entry was demoted.
    fn replace(&mut self, bias_to_b2: bool) -> bool {
        let t1_len = self.t1.len();
        let from_recent = t1_len > 0
            && (t1_len > self.p || (t1_len == self.p && bias_to_b2) || self.t2.is_empty());

        let demoted = if from_recent {
            self.t1
                .remove_oldest()
                .map(|(key, _, exp)| self.b1.add(key, (), exp))
        } else {
            self.t2
                .remove_oldest()
                .map(|(key, _, exp)| self.b2.add(key, (), exp))
        }
        .is_some();

        self.stats.record_insert(demoted);
        demoted
    }
}

impl<K, V> ConcurrentCache<K, V> for ArcCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn add(&self, key: K, value: V, expiration_time: i64) -> bool {
        ArcCache::add(self, key, value, expiration_time)
    }

    fn get(&self, key: &K) -> Option<(V, i64)> {
        ArcCache::get(self, key)
    }

    fn peek(&self, key: &K) -> Option<(V, i64)> {
        ArcCache::peek(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        ArcCache::contains(self, key)
    }

    fn remove(&self, key: &K) -> bool {
        ArcCache::remove(self, key)
    }

    fn keys(&self) -> Vec<K> {
        ArcCache::keys(self)
    }

    fn len(&self) -> usize {
        ArcCache::len(self)
    }

    fn purge(&self) {
        ArcCache::purge(self)
    }

    fn purge_overdue(&self) -> usize {
        ArcCache::purge_overdue(self)
    }

    fn stats(&self) -> CacheStats {
        ArcCache::stats(self)
    }
}

impl<K, V> fmt::Debug for ArcCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ArcCache")
            .field("size", &state.size)
            .field("p", &state.p)
            .field("t1", &state.t1)
            .field("b1", &state.b1)
            .field("t2", &state.t2)
            .field("b2", &state.b2)
            .finish()
    }
}
