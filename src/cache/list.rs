//! Eviction List Storage
//!
//! Arena-backed doubly linked list. Nodes live in a slot vector and link to
//! each other by index, so detaching, re-attaching and swapping neighbours are
//! all O(1) without unsafe code. Freed slots are recycled through a free list.
//!
//! ```text
//!   head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!          newest / heaviest     oldest / lightest
//! ```

/// Handle to a node in an [`EvictList`]. Stable until the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug)]
pub struct EvictList<T> {
    slots: Vec<Option<Node<T>>>,
    free_list: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> EvictList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(test)]
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.prev)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    pub fn push_front(&mut self, value: T) -> NodeId {
        let id = self.alloc(value);
        self.attach_front(id);
        id
    }

    pub fn push_back(&mut self, value: T) -> NodeId {
        let id = self.alloc(value);
        self.attach_back(id);
        id
    }

    /// Unlinks the node and returns its value, freeing the slot.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.node(id)?;
        self.detach(id);
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id) || self.node(id).is_none() {
            return;
        }
        self.detach(id);
        self.attach_front(id);
    }

    /// Swaps `id` with its immediate predecessor. No-op at the head.
    pub fn swap_with_prev(&mut self, id: NodeId) {
        let Some(prev) = self.prev(id) else {
            return;
        };
        self.detach(id);
        self.attach_before(id, prev);
    }

    /// Iterates values from the tail towards the head.
    pub fn iter_from_back(&self) -> IterFromBack<'_, T> {
        IterFromBack {
            list: self,
            cursor: self.tail,
        }
    }

    /// Collects node handles from the tail towards the head.
    pub fn ids_from_back(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cursor = self.tail;
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.prev(id);
        }
        ids
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn alloc(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(node);
            NodeId(idx)
        } else {
            self.slots.push(Some(node));
            NodeId(self.slots.len() - 1)
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());

        match prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn attach_front(&mut self, id: NodeId) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn attach_back(&mut self, id: NodeId) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(id) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    // `id` must already be detached.
    fn attach_before(&mut self, id: NodeId, anchor: NodeId) {
        let before = self.prev(anchor);
        if let Some(node) = self.node_mut(id) {
            node.prev = before;
            node.next = Some(anchor);
        }
        if let Some(node) = self.node_mut(anchor) {
            node.prev = Some(id);
        }
        match before {
            Some(b) => {
                if let Some(node) = self.node_mut(b) {
                    node.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
    }

    #[cfg(test)]
    fn debug_validate_invariants(&self) {
        let mut count = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self.node(id).expect("linked node must be live");
            assert_eq!(node.prev, prev);
            prev = Some(id);
            cursor = node.next;
            count += 1;
        }
        assert_eq!(self.tail, prev);
        assert_eq!(count, self.len);
    }
}

impl<T> Default for EvictList<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct IterFromBack<'a, T> {
    list: &'a EvictList<T>,
    cursor: Option<NodeId>,
}

impl<'a, T> Iterator for IterFromBack<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.node(id)?;
        self.cursor = node.prev;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_from_back<T: Clone>(list: &EvictList<T>) -> Vec<T> {
        list.iter_from_back().cloned().collect()
    }

    #[test]
    fn test_push_front_and_back_order() {
        let mut list = EvictList::new();
        list.push_front("b");
        list.push_front("a");
        list.push_back("c");

        assert_eq!(values_from_back(&list), vec!["c", "b", "a"]);
        assert_eq!(list.len(), 3);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_remove_middle_and_reuse_slot() {
        let mut list = EvictList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);
        let c = list.push_back(3);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(list.remove(b), None);
        assert_eq!(values_from_back(&list), vec![3, 1]);

        let d = list.push_back(4);
        assert_eq!(d, b);
        assert_eq!(list.prev(d), Some(c));
        assert_eq!(list.get(a), Some(&1));
        list.debug_validate_invariants();
    }

    #[test]
    fn test_move_to_front() {
        let mut list = EvictList::new();
        let a = list.push_back("a");
        list.push_back("b");
        let c = list.push_back("c");

        list.move_to_front(c);
        assert_eq!(list.front(), Some(c));
        assert_eq!(values_from_back(&list), vec!["b", "a", "c"]);

        list.move_to_front(a);
        assert_eq!(values_from_back(&list), vec!["b", "c", "a"]);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_swap_with_prev() {
        let mut list = EvictList::new();
        let a = list.push_back("a");
        let b = list.push_back("b");
        let c = list.push_back("c");

        list.swap_with_prev(c);
        assert_eq!(values_from_back(&list), vec!["b", "c", "a"]);
        assert_eq!(list.back(), Some(b));

        list.swap_with_prev(c);
        assert_eq!(list.front(), Some(c));
        assert_eq!(values_from_back(&list), vec!["b", "a", "c"]);

        // Head has no predecessor
        list.swap_with_prev(c);
        assert_eq!(list.front(), Some(c));
        assert_eq!(list.prev(a), Some(c));
        list.debug_validate_invariants();
    }

    #[test]
    fn test_clear() {
        let mut list = EvictList::new();
        list.push_back(1);
        list.push_back(2);
        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        list.debug_validate_invariants();
    }
}
