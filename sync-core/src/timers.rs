//! Cancelable timer queue for the engine's event loop.
//!
//! Scheduled work is data, not captured closures: the engine posts tagged
//! entries and interprets them when they come due. Cancellation removes the
//! tag; the heap entry is discarded lazily when it surfaces.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use syncps_types::Timestamp;

/// Handle for cancelling a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Min-heap of `(due, tag)` entries.
#[derive(Debug)]
pub struct TimerQueue<K> {
    heap: BinaryHeap<Reverse<(Timestamp, u64)>>,
    entries: HashMap<u64, K>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<K> TimerQueue<K> {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to come due at `at`.
    pub fn schedule(&mut self, at: Timestamp, kind: K) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((at, id)));
        self.entries.insert(id, kind);
        TimerId(id)
    }

    /// Cancel a scheduled entry; true when it had not yet fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id.0).is_some()
    }

    /// The earliest pending deadline, discarding cancelled leftovers.
    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        while let Some(Reverse((at, id))) = self.heap.peek().copied() {
            if self.entries.contains_key(&id) {
                return Some(at);
            }
            self.heap.pop();
        }
        None
    }

    /// Take the earliest entry due at or before `now`, if any.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<K> {
        while let Some(Reverse((at, id))) = self.heap.peek().copied() {
            if at > now {
                return None;
            }
            self.heap.pop();
            if let Some(kind) = self.entries.remove(&id) {
                return Some(kind);
            }
            // cancelled entry: keep draining
        }
        None
    }

    /// Number of live (uncancelled, unfired) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
