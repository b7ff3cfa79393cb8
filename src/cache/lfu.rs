//! Expiring Approximate LFU Module
//!
//! Implements a non-thread-safe, fixed size least-frequently-used list with
//! lazy TTL expiry. Used standalone behind [`SyncCache`](crate::cache::SyncCache)
//! and as the frequency side (T2/B2) of [`ArcCache`](crate::cache::ArcCache).
//!
//! Ordering is approximate. Every touch increments the entry's weight and, if
//! the entry now outweighs its immediate predecessor, swaps the two. Nothing
//! ever looks further than one position away, so every operation stays O(1)
//! while heavily used entries drift towards the front over time.
//!
//! New entries join at the back with weight 1, and the back is where overflow
//! eviction happens.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::list::{EvictList, NodeId};
use crate::cache::{Entry, EvictionList, OnEvict, Probe};
use crate::error::{CacheError, Result};

struct WeightedEntry<K, V> {
    entry: Entry<K, V>,
    /// Access counter
    weight: u64,
}

// == Simple LFU ==
/// Fixed size approximate LFU list.
///
/// - Front = Heaviest (most frequently used)
/// - Back = Lightest, and the most recent arrival
pub struct SimpleLfu<K, V> {
    size: usize,
    evict_list: EvictList<WeightedEntry<K, V>>,
    items: HashMap<K, NodeId>,
    on_evict: Option<OnEvict<K, V>>,
}

impl<K, V> SimpleLfu<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty LFU holding at most `size` entries.
    ///
    /// Fails with [`CacheError::InvalidSize`] when `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        Self::build_with(size, None)
    }

    /// Creates an empty LFU that calls `on_evict` whenever an entry leaves it.
    pub fn with_evict<F>(size: usize, on_evict: F) -> Result<Self>
    where
        F: Fn(&K, &V, i64) + Send + Sync + 'static,
    {
        Self::build_with(size, Some(Arc::new(on_evict)))
    }

    fn build_with(size: usize, on_evict: Option<OnEvict<K, V>>) -> Result<Self> {
        if size == 0 {
            return Err(CacheError::InvalidSize);
        }
        Ok(Self {
            size,
            evict_list: EvictList::new(),
            items: HashMap::new(),
            on_evict,
        })
    }

    // == Resize Weight ==
    /// Scales every weight to `weight * percentage / 100`.
    ///
    /// Used to decay stale frequency signals. The order of the list is left
    /// as is; it re-sorts itself gradually as entries are touched again.
    pub fn resize_weight(&mut self, percentage: u32) {
        for id in self.evict_list.ids_from_back() {
            if let Some(node) = self.evict_list.get_mut(id) {
                node.weight = node.weight.saturating_mul(u64::from(percentage)) / 100;
            }
        }
        debug!(
            "LFU weights scaled to {}% across {} entries",
            percentage,
            self.evict_list.len()
        );
    }

    /// Returns the current weight of `key` without touching it.
    pub fn weight(&self, key: &K) -> Option<u64> {
        let id = self.items.get(key)?;
        self.evict_list.get(*id).map(|node| node.weight)
    }

    // == Internals ==
    fn remove_element(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        let node = self.evict_list.remove(id)?;
        let entry = node.entry;
        self.items.remove(&entry.key);
        if let Some(on_evict) = &self.on_evict {
            on_evict(&entry.key, &entry.value, entry.expiration_time);
        }
        Some(entry)
    }

    fn is_node_expired(&self, id: NodeId) -> bool {
        self.evict_list
            .get(id)
            .is_some_and(|node| node.entry.is_expired())
    }

    fn live_node(&mut self, key: &K) -> Option<NodeId> {
        let id = *self.items.get(key)?;
        if self.is_node_expired(id) {
            self.remove_element(id);
            return None;
        }
        Some(id)
    }

    fn weight_of(&self, id: NodeId) -> u64 {
        self.evict_list.get(id).map_or(0, |node| node.weight)
    }

    /// Increments the weight and promotes one step if it now outweighs its
    /// predecessor.
    fn touch(&mut self, id: NodeId) {
        let Some(node) = self.evict_list.get_mut(id) else {
            return;
        };
        node.weight = node.weight.saturating_add(1);
        let weight = node.weight;

        if let Some(prev) = self.evict_list.prev(id) {
            if self.weight_of(prev) < weight {
                self.evict_list.swap_with_prev(id);
            }
        }
    }

    fn remove_back(&mut self) -> bool {
        match self.evict_list.back() {
            Some(id) => self.remove_element(id).is_some(),
            None => false,
        }
    }
}

impl<K, V> EvictionList for SimpleLfu<K, V>
where
    K: Eq + Hash + Clone,
{
    type Key = K;
    type Value = V;

    fn build(size: usize, on_evict: Option<OnEvict<K, V>>) -> Result<Self> {
        Self::build_with(size, on_evict)
    }

    // == Add ==
    fn add(&mut self, key: K, value: V, expiration_time: i64) -> bool {
        if let Some(&id) = self.items.get(&key) {
            if let Some(node) = self.evict_list.get_mut(id) {
                node.entry.value = value;
                node.entry.expiration_time = expiration_time;
            }
            self.touch(id);
            return false;
        }

        let mut evicted = false;
        if self.evict_list.len() >= self.size {
            evicted = self.remove_back();
            trace!("LFU full at {} entries, evicted lightest", self.size);
        }

        let id = self.evict_list.push_back(WeightedEntry {
            entry: Entry::new(key.clone(), value, expiration_time),
            weight: 1,
        });
        self.items.insert(key, id);
        evicted
    }

    // == Get ==
    fn get(&mut self, key: &K) -> Option<(&V, i64)> {
        let id = self.live_node(key)?;
        self.touch(id);
        self.evict_list
            .get(id)
            .map(|node| (&node.entry.value, node.entry.expiration_time))
    }

    // == Peek ==
    fn peek(&mut self, key: &K) -> Option<(&V, i64)> {
        let id = self.live_node(key)?;
        self.evict_list
            .get(id)
            .map(|node| (&node.entry.value, node.entry.expiration_time))
    }

    fn contains(&mut self, key: &K) -> bool {
        self.live_node(key).is_some()
    }

    fn probe(&self, key: &K) -> Probe<'_, V> {
        let Some(node) = self.items.get(key).and_then(|&id| self.evict_list.get(id)) else {
            return Probe::Absent;
        };
        if node.entry.is_expired() {
            Probe::Stale
        } else {
            Probe::Live(&node.entry.value, node.entry.expiration_time)
        }
    }

    // == Remove ==
    fn remove(&mut self, key: &K) -> bool {
        match self.items.get(key) {
            Some(&id) => self.remove_element(id).is_some(),
            None => false,
        }
    }

    fn take(&mut self, key: &K) -> Option<(V, i64)> {
        let id = self.items.remove(key)?;
        let node = self.evict_list.remove(id)?;
        Some((node.entry.value, node.entry.expiration_time))
    }

    // == Oldest ==
    fn remove_oldest(&mut self) -> Option<(K, V, i64)> {
        loop {
            let id = self.evict_list.back()?;
            let expired = self.is_node_expired(id);
            let entry = self.remove_element(id)?;
            if !expired {
                return Some((entry.key, entry.value, entry.expiration_time));
            }
        }
    }

    /// Returns the back entry, counting the lookup as a use of it.
    fn get_oldest(&mut self) -> Option<(&K, &V, i64)> {
        loop {
            let id = self.evict_list.back()?;
            if !self.is_node_expired(id) {
                let node = self.evict_list.get_mut(id)?;
                node.weight = node.weight.saturating_add(1);
                let node = &*node;
                return Some((&node.entry.key, &node.entry.value, node.entry.expiration_time));
            }
            self.remove_element(id);
        }
    }

    fn keys(&self) -> Vec<K> {
        self.evict_list
            .iter_from_back()
            .map(|node| node.entry.key.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.evict_list.len()
    }

    fn capacity(&self) -> usize {
        self.size
    }

    // == Purge ==
    fn purge(&mut self) {
        while self.remove_back() {}
        self.evict_list.clear();
        self.items.clear();
    }

    fn purge_overdue(&mut self) -> usize {
        let expired: Vec<NodeId> = self
            .evict_list
            .ids_from_back()
            .into_iter()
            .filter(|&id| self.is_node_expired(id))
            .collect();
        for &id in &expired {
            self.remove_element(id);
        }
        expired.len()
    }

    // == Resize ==
    fn resize(&mut self, size: usize) -> usize {
        let size = size.max(1);
        let diff = self.evict_list.len().saturating_sub(size);
        for _ in 0..diff {
            self.remove_back();
        }
        if diff > 0 {
            debug!("LFU resized to {}, evicted {} entries", size, diff);
        }
        self.size = size;
        diff
    }
}

impl<K, V> fmt::Debug for SimpleLfu<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleLfu")
            .field("size", &self.size)
            .field("len", &self.evict_list.len())
            .finish_non_exhaustive()
    }
}
