//! Bounded time-to-live cache with insertion-order eviction.

use crate::TimeSource;
use core::hash::Hash;
use core::time::Duration;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    fetched_at: u64,
    generation: u64,
}

/// A key-value store whose entries expire after a fixed TTL.
///
/// Entries are only ever replaced whole. When an insert pushes the cache past
/// its capacity, the entry that was inserted (or last replaced) longest ago is
/// evicted. Expired entries read as misses and are dropped on access.
#[derive(Debug)]
pub struct TtlCache<K, V, T> {
    entries: HashMap<K, Entry<V>>,
    // Insertion log; an item is stale once its key was replaced or removed.
    order: VecDeque<(K, u64)>,
    next_generation: u64,
    ttl_millis: u64,
    capacity: usize,
    clock: T,
}

impl<K, V, T> TtlCache<K, V, T>
where
    K: Eq + Hash + Clone,
    V: Clone,
    T: TimeSource,
{
    /// Creates an empty cache holding at most `capacity` entries, each for at
    /// most `ttl`.
    pub fn new(capacity: usize, ttl: Duration, clock: T) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            next_generation: 0,
            ttl_millis: ttl.as_millis() as u64,
            capacity,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a clone of the live value for `key`.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.current_millis();
        let entry = self.entries.get(key)?;
        if self.is_expired(entry, now) {
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts or replaces the value for `key`, stamping it with the current
    /// time, then evicts the oldest entries while over capacity.
    pub fn insert(&mut self, key: K, value: V) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let fetched_at = self.clock.current_millis();

        self.entries.insert(
            key.clone(),
            Entry {
                value,
                fetched_at,
                generation,
            },
        );
        self.order.push_back((key, generation));

        while self.entries.len() > self.capacity {
            let Some((oldest, generation)) = self.order.pop_front() else {
                break;
            };
            if self.is_current(&oldest, generation) {
                self.entries.remove(&oldest);
            }
        }

        if self.order.len() > self.capacity.saturating_mul(2).max(16) {
            self.compact();
        }
    }

    /// Removes the entry for `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Drops every expired entry.
    pub fn purge_expired(&mut self) {
        let now = self.clock.current_millis();
        let ttl = self.ttl_millis;
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.fetched_at) < ttl);
        self.compact();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn is_expired(&self, entry: &Entry<V>, now: u64) -> bool {
        now.saturating_sub(entry.fetched_at) >= self.ttl_millis
    }

    fn is_current(&self, key: &K, generation: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(key, generation)| {
            entries
                .get(key)
                .is_some_and(|entry| entry.generation == *generation)
        });
    }
}
