//! Memory consolidation.
//!
//! Decides when a short-term entry migrates to long-term storage and
//! performs the move. Consolidation is eager: the memory manager evaluates
//! the policy synchronously inside every ingest, so there is no background
//! sweep racing with retrieval.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::MemoryConfig;
use crate::types::{MemoryEntry, MemoryTier};

use super::long_term::LongTermStore;
use super::short_term::ShortTermStore;

/// Why an entry was promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionReason {
    /// Importance reached the relevance threshold.
    Threshold,
    /// The entry was about to be evicted from a full short-term store and
    /// was the most important of the eviction candidates.
    Rescue,
}

/// Promotion rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationPolicy {
    /// Importance at or above which an entry is promoted.
    pub relevance_threshold: f64,
    /// Whether eviction candidates may be rescued into long-term.
    pub rescue_on_eviction: bool,
    /// Minimum importance for a rescue.
    pub rescue_min_importance: f64,
}

impl Default for ConsolidationPolicy {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl ConsolidationPolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            relevance_threshold: config.relevance_threshold,
            rescue_on_eviction: config.rescue_on_eviction,
            rescue_min_importance: config.rescue_min_importance,
        }
    }

    /// Evaluate an entry held in `short_term`.
    pub fn evaluate(
        &self,
        entry: &MemoryEntry,
        short_term: &ShortTermStore,
    ) -> Option<PromotionReason> {
        if entry.tier() != MemoryTier::ShortTerm {
            return None;
        }

        if entry.importance() >= self.relevance_threshold {
            return Some(PromotionReason::Threshold);
        }

        let candidates: Vec<&MemoryEntry> = short_term.eviction_candidate().into_iter().collect();
        match self.select_rescue(&candidates) {
            Some(rescued) if rescued.id() == entry.id() => Some(PromotionReason::Rescue),
            _ => None,
        }
    }

    /// Whether `entry` should move to long-term storage.
    pub fn should_promote(&self, entry: &MemoryEntry, short_term: &ShortTermStore) -> bool {
        self.evaluate(entry, short_term).is_some()
    }

    /// The most important of the entries about to be evicted, if rescue is
    /// enabled and it clears the rescue floor.
    pub fn select_rescue<'a>(&self, candidates: &[&'a MemoryEntry]) -> Option<&'a MemoryEntry> {
        if !self.rescue_on_eviction {
            return None;
        }

        candidates
            .iter()
            .copied()
            .max_by(|a, b| {
                a.importance().total_cmp(&b.importance()).then_with(|| {
                    (a.created_at(), a.sequence()).cmp(&(b.created_at(), b.sequence()))
                })
            })
            .filter(|e| e.importance() >= self.rescue_min_importance)
    }
}

/// Result of moving an entry into long-term storage.
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    /// ID of the entry that left short-term.
    pub promoted_id: String,
    /// Entry pushed out of long-term by the insert. May be the promoted
    /// entry itself when it scored lowest in a full store.
    pub evicted: Option<MemoryEntry>,
}

impl PromotionOutcome {
    /// Whether the promoted entry survived its long-term insert.
    pub fn retained(&self) -> bool {
        self.evicted
            .as_ref()
            .is_none_or(|e| e.id() != self.promoted_id)
    }
}

/// Move an entry from short-term to long-term storage.
///
/// Returns `None` when `id` is not in the short-term store. The tier flips
/// exactly once, here.
pub fn promote(
    short_term: &mut ShortTermStore,
    long_term: &mut LongTermStore,
    id: &str,
    now: DateTime<Utc>,
) -> Option<PromotionOutcome> {
    let mut entry = short_term.remove(id)?;
    entry.mark_long_term();

    let importance = entry.importance();
    let evicted = long_term.insert(entry, now);

    debug!(
        entry_id = %id,
        importance,
        evicted = evicted.as_ref().map(|e| e.id()),
        "Promoted entry to long-term memory"
    );

    Some(PromotionOutcome {
        promoted_id: id.to_string(),
        evicted,
    })
}
