//! Expiring LRU Module
//!
//! Implements a non-thread-safe, fixed size least-recently-used list with
//! lazy TTL expiry. Used standalone behind [`SyncCache`](crate::cache::SyncCache)
//! and as the recency side (T1/B1) of [`ArcCache`](crate::cache::ArcCache).

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::list::{EvictList, NodeId};
use crate::cache::{Entry, EvictionList, OnEvict, Probe};
use crate::error::{CacheError, Result};

// == Simple LRU ==
/// Fixed size LRU list.
///
/// Entries are kept in a linked list where:
/// - Front = Most recently used
/// - Back = Least recently used
pub struct SimpleLru<K, V> {
    size: usize,
    evict_list: EvictList<Entry<K, V>>,
    items: HashMap<K, NodeId>,
    on_evict: Option<OnEvict<K, V>>,
}

impl<K, V> SimpleLru<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty LRU holding at most `size` entries.
    ///
    /// Fails with [`CacheError::InvalidSize`] when `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        Self::build_with(size, None)
    }

    /// Creates an empty LRU that calls `on_evict` whenever an entry leaves it.
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

    // == Internals ==
    fn remove_element(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        let entry = self.evict_list.remove(id)?;
        self.items.remove(&entry.key);
        if let Some(on_evict) = &self.on_evict {
            on_evict(&entry.key, &entry.value, entry.expiration_time);
        }
        Some(entry)
    }

    fn is_node_expired(&self, id: NodeId) -> bool {
        self.evict_list.get(id).is_some_and(Entry::is_expired)
    }

    /// Resolves a key to a node, dropping it first if it has expired.
    fn live_node(&mut self, key: &K) -> Option<NodeId> {
        let id = *self.items.get(key)?;
        if self.is_node_expired(id) {
            self.remove_element(id);
            return None;
        }
        Some(id)
    }

    fn remove_back(&mut self) -> bool {
        match self.evict_list.back() {
            Some(id) => self.remove_element(id).is_some(),
            None => false,
        }
    }
}

impl<K, V> EvictionList for SimpleLru<K, V>
where
    K: Eq + Hash + Clone,
{
    type Key = K;
    type Value = V;

    fn build(size: usize, on_evict: Option<OnEvict<K, V>>) -> Result<Self> {
        Self::build_with(size, on_evict)
    }

    // == Add ==
    /// Inserts or updates and moves the entry to the front. Evicts the back
    /// entry first when a new key arrives at capacity.
    fn add(&mut self, key: K, value: V, expiration_time: i64) -> bool {
        if let Some(&id) = self.items.get(&key) {
            self.evict_list.move_to_front(id);
            if let Some(entry) = self.evict_list.get_mut(id) {
                entry.value = value;
                entry.expiration_time = expiration_time;
            }
            return false;
        }

        let mut evicted = false;
        if self.evict_list.len() >= self.size {
            evicted = self.remove_back();
            trace!("LRU full at {} entries, evicted oldest", self.size);
        }

        let id = self
            .evict_list
            .push_front(Entry::new(key.clone(), value, expiration_time));
        self.items.insert(key, id);
        evicted
    }

    // == Get ==
    fn get(&mut self, key: &K) -> Option<(&V, i64)> {
        let id = self.live_node(key)?;
        self.evict_list.move_to_front(id);
        self.evict_list
            .get(id)
            .map(|entry| (&entry.value, entry.expiration_time))
    }

    // == Peek ==
    fn peek(&mut self, key: &K) -> Option<(&V, i64)> {
        let id = self.live_node(key)?;
        self.evict_list
            .get(id)
            .map(|entry| (&entry.value, entry.expiration_time))
    }

    fn contains(&mut self, key: &K) -> bool {
        self.live_node(key).is_some()
    }

    fn probe(&self, key: &K) -> Probe<'_, V> {
        let Some(entry) = self.items.get(key).and_then(|&id| self.evict_list.get(id)) else {
            return Probe::Absent;
        };
        if entry.is_expired() {
            Probe::Stale
        } else {
            Probe::Live(&entry.value, entry.expiration_time)
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
        let entry = self.evict_list.remove(id)?;
        Some((entry.value, entry.expiration_time))
    }

    // == Oldest ==
    /// Removes and returns the least recently used live entry. Expired
    /// entries found at the back are evicted on the way.
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

    fn get_oldest(&mut self) -> Option<(&K, &V, i64)> {
        loop {
            let id = self.evict_list.back()?;
            if !self.is_node_expired(id) {
                return self
                    .evict_list
                    .get(id)
                    .map(|entry| (&entry.key, &entry.value, entry.expiration_time));
            }
            self.remove_element(id);
        }
    }

    fn keys(&self) -> Vec<K> {
        self.evict_list
            .iter_from_back()
            .map(|entry| entry.key.clone())
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
            debug!("LRU resized to {}, evicted {} entries", size, diff);
        }
        self.size = size;
        diff
    }
}

impl<K, V> fmt::Debug for SimpleLru<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleLru")
            .field("size", &self.size)
            .field("len", &self.evict_list.len())
            .finish_non_exhaustive()
    }
}
