//! Ranked retrieval across both stores.
//!
//! Every candidate is scored with
//!
//! ```text
//! composite = α * relevance + β * importance + γ * 0.5^(age_hours / half_life)
//! ```
//!
//! Short-term entries are always candidates. Long-term entries come from a
//! similarity search whose width grows until no unsearched entry could
//! outrank the current k-th candidate.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{MemoryConfig, RetrievalWeights};
use crate::types::{MemoryEntry, QueryContext, RetrievedMemory};

use super::embeddings::normalize_similarity;
use super::long_term::LongTermStore;
use super::scoring::ScoringEngine;
use super::short_term::ShortTermStore;

/// Composite ranking over short-term and long-term memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Retriever {
    weights: RetrievalWeights,
    half_life_hours: f64,
    candidate_multiplier: usize,
}

#[derive(Clone, Copy)]
struct Candidate<'a> {
    entry: &'a MemoryEntry,
    relevance: f64,
    recency: f64,
    composite: f64,
}

impl Default for Retriever {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl Retriever {
    pub fn new(
        weights: RetrievalWeights,
        half_life_hours: f64,
        candidate_multiplier: usize,
    ) -> Self {
        Self {
            weights,
            half_life_hours,
            candidate_multiplier: candidate_multiplier.max(1),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            config.retrieval_weights,
            config.recency_half_life_hours,
            config.candidate_multiplier,
        )
    }

    /// Exponential half-life decay: 1 at age 0, 0.5 after one half-life.
    pub fn recency_decay(&self, age_hours: f64) -> f64 {
        if self.half_life_hours <= 0.0 {
            return if age_hours <= 0.0 { 1.0 } else { 0.0 };
        }
        0.5f64.powf(age_hours.max(0.0) / self.half_life_hours)
    }

    pub fn composite(&self, relevance: f64, importance: f64, recency: f64) -> f64 {
        self.weights.relevance * relevance
            + self.weights.importance * importance
            + self.weights.recency * recency
    }

    /// Rank candidates from both stores and return at most `k`, highest
    /// composite first. Ties go to the more recently created entry.
    ///
    /// Access counts are not touched here.
    #[allow(clippy::too_many_arguments)]
    pub fn rank(
        &self,
        short_term: &ShortTermStore,
        long_term: &LongTermStore,
        scorer: &dyn ScoringEngine,
        query: &QueryContext,
        query_embedding: &[f32],
        k: usize,
        now: DateTime<Utc>,
    ) -> Vec<RetrievedMemory> {
        if k == 0 {
            return Vec::new();
        }

        let short_candidates: Vec<Candidate<'_>> = short_term
            .all()
            .into_iter()
            .filter(|e| query.accepts(e))
            .map(|e| self.candidate(e, scorer, query_embedding, now))
            .collect();

        let mut width = k.saturating_mul(self.candidate_multiplier);
        let mut rounds = 0usize;
        let pool = loop {
            rounds += 1;
            let hits = long_term.search(query_embedding, width);
            let exhausted = hits.len() >= long_term.len();
            let kth_similarity = hits.last().map(|(_, sim)| *sim);

            let mut pool: Vec<Candidate<'_>> = hits
                .into_iter()
                .filter(|(e, _)| query.accepts(e))
                .map(|(e, _)| self.candidate(e, scorer, query_embedding, now))
                .chain(short_candidates.iter().copied())
                .collect();
            pool.sort_by(rank_order);

            if exhausted {
                break pool;
            }

            // Best composite any unsearched long-term entry could reach
            let bound = self.composite(
                kth_similarity.map(normalize_similarity).unwrap_or(1.0),
                long_term.max_importance(),
                1.0,
            );
            if pool.len() >= k && pool[k - 1].composite >= bound {
                break pool;
            }

            width = width.saturating_mul(2);
        };

        debug!(
            k,
            rounds,
            pool = pool.len(),
            short_term = short_candidates.len(),
            "Ranked retrieval candidates"
        );

        pool.into_iter()
            .take(k)
            .map(|c| RetrievedMemory {
                entry: c.entry.clone(),
                relevance: c.relevance,
                recency: c.recency,
                composite: c.composite,
            })
            .collect()
    }

    fn candidate<'a>(
        &self,
        entry: &'a MemoryEntry,
        scorer: &dyn ScoringEngine,
        query_embedding: &[f32],
        now: DateTime<Utc>,
    ) -> Candidate<'a> {
        let relevance = scorer.relevance(entry, query_embedding);
        let recency = self.recency_decay(entry.age_hours(now));
        Candidate {
            entry,
            relevance,
            recency,
            composite: self.composite(relevance, entry.importance(), recency),
        }
    }
}

/// Composite descending, then newest first.
fn rank_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.composite.total_cmp(&a.composite).then_with(|| {
        (b.entry.created_at(), b.entry.sequence()).cmp(&(a.entry.created_at(), a.entry.sequence()))
    })
}
