//! C9 — the LFU result cache: a thread-safe, capacity-bounded
//! fingerprint-to-result map (spec.md §4.5). Grounded on
//! `util/LfuCache.hpp`'s single mutex guarding both a `key -> entry` map
//! and a min-heap of access counters, re-cast from its "mutate in place,
//! then call `std::make_heap` again" update pattern — `std::BinaryHeap`
//! has no decrease/increase-key — to the standard Rust lazy-deletion
//! idiom: push a fresh heap entry on every bump, and let eviction skip
//! past entries whose recorded priority no longer matches the map.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};

struct Slot<T> {
    value: Arc<T>,
    priority: u32,
}

struct Inner<T> {
    storage: HashMap<String, Slot<T>>,
    heap: BinaryHeap<Reverse<(u32, String)>>,
    access_count: u64,
    hit_count: u64,
}

impl<T> Inner<T> {
    /// Evicts the lowest-priority live entry if the cache is already full.
    /// Ties are broken by key, ascending — arbitrary but deterministic,
    /// matching the "deterministic per build" tie-break spec.md §4.5
    /// calls for.
    fn evict_if_full(&mut self, capacity: usize) {
        if self.storage.len() < capacity {
            return;
        }
        while let Some(Reverse((priority, key))) = self.heap.pop() {
            if self.storage.get(&key).map(|s| s.priority) == Some(priority) {
                self.storage.remove(&key);
                return;
            }
            // Stale heap entry: its key was since removed or re-prioritized.
        }
    }
}

/// A fixed-capacity LFU cache shared by reference across request
/// threads. Capacity 0 disables it entirely: every `insert`/`update` is
/// a no-op and `find` always misses.
pub struct LfuCache<T> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

impl<T> LfuCache<T> {
    pub fn new(capacity: usize) -> Self {
        LfuCache {
            capacity,
            inner: Mutex::new(Inner {
                storage: HashMap::with_capacity(capacity),
                heap: BinaryHeap::with_capacity(capacity),
                access_count: 0,
                hit_count: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn access_count(&self) -> u64 {
        self.inner.lock().unwrap().access_count
    }

    pub fn hit_rate(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        if inner.access_count == 0 {
            0.0
        } else {
            inner.hit_count as f64 / inner.access_count as f64
        }
    }

    /// Looks up `key`, bumping its priority on a hit.
    pub fn find(&self, key: &str) -> Option<Arc<T>> {
        let mut inner = self.inner.lock().unwrap();
        inner.access_count += 1;
        let found = inner.storage.get_mut(key).map(|slot| {
            slot.priority = slot.priority.saturating_add(1);
            (slot.priority, slot.value.clone())
        });
        match found {
            Some((priority, value)) => {
                inner.heap.push(Reverse((priority, key.to_string())));
                inner.hit_count += 1;
                Some(value)
            }
            None => None,
        }
    }

    /// Inserts `key` if absent, evicting the least-used entry first if
    /// the cache is full. Returns `false` (a no-op) if `key` is already
    /// present or the cache has zero capacity — use [`Self::update`] to
    /// overwrite.
    pub fn insert(&self, key: impl Into<String>, value: Arc<T>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let key = key.into();
        let mut inner = self.inner.lock().unwrap();
        if inner.storage.contains_key(&key) {
            return false;
        }
        inner.evict_if_full(self.capacity);
        inner.heap.push(Reverse((1, key.clone())));
        inner.storage.insert(key, Slot { value, priority: 1 });
        true
    }

    /// Inserts or overwrites `key`, resetting its priority to 1.
    pub fn update(&self, key: impl Into<String>, value: Arc<T>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.storage.get_mut(&key) {
            slot.value = value;
            slot.priority = 1;
            inner.heap.push(Reverse((1, key)));
        } else {
            inner.evict_if_full(self.capacity);
            inner.heap.push(Reverse((1, key.clone())));
            inner.storage.insert(key, Slot { value, priority: 1 });
        }
    }

    pub fn erase(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.storage.remove(key);
        // The heap keeps whatever stale entries existed for `key`; they
        // are discarded lazily the next time eviction walks past them.
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.storage.clear();
        inner.heap.clear();
    }
}
