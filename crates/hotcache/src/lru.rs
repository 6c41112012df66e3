//! LRU (Least Recently Used) list with per-entry access times
//!
//! Nodes live in a slot arena linked by index. The head is the least recently
//! used entry and the tail the most recently used one; a hit relocates the
//! existing node to the tail, it never links a second node for the same key.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use ahash::RandomState;

/// Node in the LRU doubly-linked list
struct Node<K, V> {
    key: K,
    value: V,
    touched: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU list with fixed capacity
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU list holding at most `capacity` entries
    ///
    /// A capacity of zero is allowed: every insert is evicted on the spot.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Get a value, marking it most recently used at `now`
    pub fn get(&mut self, key: &K, now: Instant) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_back(idx);
        let node = self.nodes[idx].as_mut()?;
        node.touched = now;
        Some(&node.value)
    }

    /// Look at a value and its last access time without touching recency
    pub fn peek(&self, key: &K) -> Option<(&V, Instant)> {
        let idx = *self.map.get(key)?;
        self.nodes[idx]
            .as_ref()
            .map(|node| (&node.value, node.touched))
    }

    /// Insert or update a key, marking it most recently used at `now`
    ///
    /// # Returns
    /// * `Option<(K, V)>` - The entry pushed out to make room, if any
    pub fn put(&mut self, key: K, value: V, now: Instant) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
                node.touched = now;
            }
            self.move_to_back(idx);
            return None;
        }

        if self.capacity == 0 {
            return Some((key, value));
        }

        let evicted = if self.map.len() >= self.capacity {
            self.pop_front()
        } else {
            None
        };

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            touched: now,
            prev: self.tail,
            next: None,
        });
        self.link_back(idx);
        self.map.insert(key, idx);

        evicted
    }

    /// Remove a key from the list
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.free_node(idx);
        self.nodes[idx].take().map(|node| node.value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        let idx = self.head?;
        self.unlink(idx);
        self.free_node(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Last access time of the least recently used entry
    pub fn front_touched(&self) -> Option<Instant> {
        let idx = self.head?;
        self.nodes[idx].as_ref().map(|node| node.touched)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Vec<&K> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Keys with their last access time, from least to most recently used
    pub fn entries(&self) -> Vec<(&K, Instant)> {
        let mut entries = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match &self.nodes[idx] {
                Some(node) => {
                    entries.push((&node.key, node.touched));
                    cursor = node.next;
                }
                None => break,
            }
        }
        entries
    }

    /// Get the current size of the list
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the list
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    fn move_to_back(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return; // Already most recent
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = self.tail;
            node.next = None;
        }

        self.link_back(idx);
    }

    /// Attach a node whose `prev` already points at the current tail
    fn link_back(&mut self, idx: usize) {
        if let Some(tail_idx) = self.tail {
            if let Some(tail) = &mut self.nodes[tail_idx] {
                tail.next = Some(idx);
            }
        }

        self.tail = Some(idx);
        if self.head.is_none() {
            self.head = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = if let Some(node) = &self.nodes[idx] {
            (node.prev, node.next)
        } else {
            return;
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}
