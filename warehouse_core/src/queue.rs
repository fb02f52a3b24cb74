//! Min-priority queue with decrease-key.
//!
//! Entries live in a `BinaryHeap`; lowering an item's priority pushes a new
//! heap entry and leaves the old one behind as stale. The `live` index holds
//! the current `(priority, seq)` of every queued item, and `pop` discards heap
//! entries that no longer match it.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    hash::Hash,
};

#[derive(Debug)]
struct Entry<T> {
    priority: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on both keys so the max-heap pops the smallest priority,
        // and among equal priorities the earliest insertion.
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-priority queue keyed by item.
///
/// Each item is queued at most once. Ties between equal priorities are broken
/// by first insertion order; lowering a priority keeps the item's original
/// position among equals.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    live: HashMap<T, (f64, u64)>,
    next_seq: u64,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        PriorityQueue {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Clone + Eq + Hash> PriorityQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item`, or lowers its priority if `priority` is strictly
    /// better than the stored one. Anything else is a no-op.
    pub fn update(&mut self, item: T, priority: f64) {
        match self.live.get_mut(&item) {
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.live.insert(item.clone(), (priority, seq));
                self.heap.push(Entry {
                    priority,
                    seq,
                    item,
                });
            }
            Some((stored, seq)) if priority < *stored => {
                *stored = priority;
                self.heap.push(Entry {
                    priority,
                    seq: *seq,
                    item,
                });
            }
            Some(_) => {}
        }
    }

    /// Removes and returns the item with the lowest priority.
    pub fn pop(&mut self) -> Option<(T, f64)> {
        while let Some(entry) = self.heap.pop() {
            let current = self.live.get(&entry.item).copied();
            if current == Some((entry.priority, entry.seq)) {
                self.live.remove(&entry.item);
                return Some((entry.item, entry.priority));
            }
        }
        None
    }

    /// Priority of the item `pop` would return next.
    pub fn peek_priority(&mut self) -> Option<f64> {
        while let Some(entry) = self.heap.peek() {
            if self.live.get(&entry.item).copied() == Some((entry.priority, entry.seq)) {
                return Some(entry.priority);
            }
            self.heap.pop();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
