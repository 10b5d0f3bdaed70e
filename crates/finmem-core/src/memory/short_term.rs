//! Short-term store: a bounded, lossy recency buffer of raw events.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::MemoryEntry;

/// Bounded container for the most recent entries.
///
/// When full, an insert first evicts the least important entry, breaking
/// ties by age (oldest first).
#[derive(Debug, Clone)]
pub struct ShortTermStore {
    capacity: usize,
    entries: Vec<MemoryEntry>,
}

impl ShortTermStore {
    /// Create an empty store. A zero capacity is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::CapacityConfiguration {
                store: "short-term",
                capacity,
            });
        }
        Ok(Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Insert an entry, evicting first when at capacity.
    ///
    /// Returns the evicted entry, if any.
    pub fn insert(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let evicted = if self.is_full() { self.evict() } else { None };
        self.entries.push(entry);
        evicted
    }

    /// The entry the next insert would evict, if the store is full.
    pub fn eviction_candidate(&self) -> Option<&MemoryEntry> {
        if !self.is_full() {
            return None;
        }
        self.entries.iter().min_by(|a, b| eviction_order(a, b))
    }

    /// All entries, most recent first.
    pub fn all(&self) -> Vec<&MemoryEntry> {
        let mut all: Vec<&MemoryEntry> = self.entries.iter().collect();
        all.sort_by(|a, b| (b.created_at(), b.sequence()).cmp(&(a.created_at(), a.sequence())));
        all
    }

    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut MemoryEntry> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    /// Take an entry out of the store (used by promotion).
    pub(crate) fn remove(&mut self, id: &str) -> Option<MemoryEntry> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(index))
    }

    fn evict(&mut self) -> Option<MemoryEntry> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| eviction_order(a, b))
            .map(|(i, _)| i)?;
        Some(self.entries.remove(index))
    }
}

/// Lexicographic `(importance, recency)` key: least important first, then oldest.
fn eviction_order(a: &MemoryEntry, b: &MemoryEntry) -> Ordering {
    a.importance()
        .total_cmp(&b.importance())
        .then_with(|| (a.created_at(), a.sequence()).cmp(&(b.created_at(), b.sequence())))
}
