//! Long-term store: consolidated, high-importance entries with similarity search.
//!
//! The index is a flat exact scan. Search is deterministic for a fixed store
//! state and query, and `search(q, k)` always returns the true top-k by
//! cosine similarity, which the retriever relies on to bound its candidate
//! pool.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::config::EvictionWeights;
use crate::error::{Error, Result};
use crate::types::MemoryEntry;

use super::embeddings::cosine_similarity;

/// Bounded container for promoted entries.
#[derive(Debug, Clone)]
pub struct LongTermStore {
    capacity: usize,
    weights: EvictionWeights,
    entries: Vec<MemoryEntry>,
}

impl LongTermStore {
    /// Create an empty store. A zero capacity is rejected.
    pub fn new(capacity: usize, weights: EvictionWeights) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::CapacityConfiguration {
                store: "long-term",
                capacity,
            });
        }
        Ok(Self {
            capacity,
            weights,
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

    /// Insert an entry, evicting the lowest-scored member when full.
    ///
    /// The incoming entry competes with the residents: if it scores lowest it
    /// is returned immediately and the store is unchanged. Otherwise the
    /// evicted resident (if any) is returned.
    pub fn insert(&mut self, entry: MemoryEntry, now: DateTime<Utc>) -> Option<MemoryEntry> {
        if !self.is_full() {
            self.entries.push(entry);
            return None;
        }

        let max_access = self
            .entries
            .iter()
            .map(|e| e.access_count())
            .chain(std::iter::once(entry.access_count()))
            .max()
            .unwrap_or(0);

        let incoming_score = self.eviction_score(&entry, now, max_access);
        let victim = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, self.eviction_score(e, now, max_access)))
            .min_by(|(ia, sa), (ib, sb)| {
                sa.total_cmp(sb)
                    .then_with(|| older_first(&self.entries[*ia], &self.entries[*ib]))
            });

        match victim {
            Some((index, score))
                if score < incoming_score
                    || (score == incoming_score
                        && older_first(&self.entries[index], &entry) == Ordering::Less) =>
            {
                let evicted = self.entries.remove(index);
                self.entries.push(entry);
                Some(evicted)
            }
            _ => Some(entry),
        }
    }

    /// Combined retention score: `w1*importance + w2/(1+age_hours) + w3*access_norm`.
    ///
    /// `max_access` normalises the access count; zero means no entry has
    /// been retrieved yet and the access term vanishes.
    pub fn eviction_score(&self, entry: &MemoryEntry, now: DateTime<Utc>, max_access: u32) -> f64 {
        let recency = 1.0 / (1.0 + entry.age_hours(now));
        let access = if max_access == 0 {
            0.0
        } else {
            entry.access_count() as f64 / max_access as f64
        };
        self.weights.importance * entry.importance()
            + self.weights.recency * recency
            + self.weights.access * access
    }

    /// Top-`k` entries by cosine similarity to `query`, highest first.
    ///
    /// Ties break towards the more recent entry.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&MemoryEntry, f32)> {
        let mut scored: Vec<(&MemoryEntry, f32)> = self
            .entries
            .iter()
            .map(|e| (e, cosine_similarity(e.embedding(), query)))
            .collect();

        scored.sort_by(|(ea, sa), (eb, sb)| {
            sb.total_cmp(sa).then_with(|| {
                (eb.created_at(), eb.sequence()).cmp(&(ea.created_at(), ea.sequence()))
            })
        });
        scored.truncate(k);
        scored
    }

    /// Highest importance held, 0 when empty.
    pub fn max_importance(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.importance())
            .fold(0.0, f64::max)
    }

    /// All entries in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
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
}

fn older_first(a: &MemoryEntry, b: &MemoryEntry) -> Ordering {
    (a.created_at(), a.sequence()).cmp(&(b.created_at(), b.sequence()))
}
