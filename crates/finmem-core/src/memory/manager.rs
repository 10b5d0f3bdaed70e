//! Memory manager.
//!
//! The façade the decision loop talks to. Owns both stores and runs the
//! ingest pipeline as explicit steps:
//!
//! ```text
//! validate ─▶ embed ─▶ score ─▶ short-term insert ─▶ consolidate
//!                                  │ (full)                │
//!                                  ▼                       ▼
//!                        rescue or drop victim      promote to long-term
//! ```
//!
//! Both stores sit behind one `RwLock`, so an ingest (including its
//! promotion and evictions) is observed entirely or not at all. Embedding
//! runs before the lock is taken.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::error::{EmbeddingError, Error, Result};
use crate::types::{
    clamp_unit, MemoryEntry, MemoryStats, MemoryTier, QueryContext, RawEvent, RetrievedMemory,
};
use crate::utils::{format_datetime, now_utc, validate_embedding, validate_event, ValidationError};

use super::consolidation::{promote, ConsolidationPolicy, PromotionReason};
use super::embeddings::{Embedder, HashingEmbedder};
use super::long_term::LongTermStore;
use super::retrieval::Retriever;
use super::scoring::{MarketEventScorer, ScoringEngine};
use super::short_term::ShortTermStore;

/// Layered memory façade.
pub struct MemoryManager {
    config: MemoryConfig,
    embedder: Arc<dyn Embedder>,
    scorer: Arc<dyn ScoringEngine>,
    policy: ConsolidationPolicy,
    retriever: Retriever,
    state: RwLock<MemoryState>,
}

struct MemoryState {
    short_term: ShortTermStore,
    long_term: LongTermStore,
    next_sequence: u64,
    promoted: u64,
    rescued: u64,
    evicted_short_term: u64,
    evicted_long_term: u64,
}

impl MemoryState {
    fn new(config: &MemoryConfig) -> Result<Self> {
        Ok(Self {
            short_term: ShortTermStore::new(config.short_term_capacity)?,
            long_term: LongTermStore::new(config.long_term_capacity, config.eviction_weights)?,
            next_sequence: 0,
            promoted: 0,
            rescued: 0,
            evicted_short_term: 0,
            evicted_long_term: 0,
        })
    }

    fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.long_term.is_empty()
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut MemoryEntry> {
        match self.short_term.get_mut(id) {
            Some(entry) => Some(entry),
            None => self.long_term.get_mut(id),
        }
    }
}

impl MemoryManager {
    /// Create a manager with explicit embedding and scoring capabilities.
    ///
    /// Fails with [`Error::CapacityConfiguration`] if either store could
    /// never hold an entry, and with [`Error::InvalidConfig`] if the
    /// embedder's output size disagrees with `embedding_dimension`.
    pub fn new(
        config: MemoryConfig,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn ScoringEngine>,
    ) -> Result<Self> {
        config.check_capacities()?;

        if embedder.dimensions() != config.embedding_dimension {
            return Err(Error::invalid_config(
                "embedding_dimension",
                format!(
                    "configured {} but embedder produces {}",
                    config.embedding_dimension,
                    embedder.dimensions()
                ),
            ));
        }

        let state = MemoryState::new(&config)?;

        info!(
            short_term_capacity = config.short_term_capacity,
            long_term_capacity = config.long_term_capacity,
            relevance_threshold = config.relevance_threshold,
            embedding_dimension = config.embedding_dimension,
            "Memory manager initialized"
        );

        Ok(Self {
            policy: ConsolidationPolicy::from_config(&config),
            retriever: Retriever::from_config(&config),
            config,
            embedder,
            scorer,
            state: RwLock::new(state),
        })
    }

    /// Manager with the hashing embedder and the market event scorer.
    pub fn with_defaults(config: MemoryConfig) -> Result<Self> {
        let embedder = Arc::new(HashingEmbedder::new(config.embedding_dimension));
        let scorer = Arc::new(MarketEventScorer::new(config.scoring.clone()));
        Self::new(config, embedder, scorer)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Ingest a raw event and return the new entry's ID.
    ///
    /// Invalid input and embedding failures abort before any store is
    /// touched.
    pub async fn ingest(&self, event: RawEvent) -> Result<String> {
        validate_event(&event).map_err(|e| Error::invalid_event(e.to_string()))?;

        let embedding = match &event.embedding {
            Some(supplied) => {
                validate_embedding(supplied, self.config.embedding_dimension)
                    .map_err(|e| Error::invalid_event(e.to_string()))?;
                supplied.clone()
            }
            None => self.embed(&event.content).await?,
        };

        let importance = clamp_unit(self.scorer.importance(&event));
        let id = Uuid::new_v4().to_string();
        let now = now_utc();

        let mut state = self.state.write().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let entry = MemoryEntry::new(id.clone(), event, embedding, importance, now, sequence);
        debug!(entry_id = %id, importance, source = %entry.source(), "Ingesting event");

        self.insert_short_term(&mut state, entry, now);

        let threshold_hit = state
            .short_term
            .get(&id)
            .and_then(|e| self.policy.evaluate(e, &state.short_term))
            == Some(PromotionReason::Threshold);
        if threshold_hit {
            self.promote_locked(&mut state, &id, now, PromotionReason::Threshold);
        }

        Ok(id)
    }

    /// Insert into short-term, rescuing or dropping the victim when full.
    fn insert_short_term(&self, state: &mut MemoryState, entry: MemoryEntry, now: DateTime<Utc>) {
        let rescue = state
            .short_term
            .eviction_candidate()
            .filter(|c| self.policy.evaluate(c, &state.short_term) == Some(PromotionReason::Rescue))
            .map(|c| c.id().to_string());

        if let Some(id) = rescue {
            self.promote_locked(state, &id, now, PromotionReason::Rescue);
        }

        if let Some(evicted) = state.short_term.insert(entry) {
            state.evicted_short_term += 1;
            debug!(
                entry_id = %evicted.id(),
                importance = evicted.importance(),
                store = "short-term",
                "Evicted entry"
            );
        }
    }

    fn promote_locked(
        &self,
        state: &mut MemoryState,
        id: &str,
        now: DateTime<Utc>,
        reason: PromotionReason,
    ) {
        let Some(outcome) = promote(&mut state.short_term, &mut state.long_term, id, now) else {
            return;
        };

        match reason {
            PromotionReason::Threshold => state.promoted += 1,
            PromotionReason::Rescue => state.rescued += 1,
        }

        if let Some(evicted) = outcome.evicted {
            state.evicted_long_term += 1;
            debug!(
                entry_id = %evicted.id(),
                importance = evicted.importance(),
                store = "long-term",
                rejected_on_arrival = evicted.id() == outcome.promoted_id,
                "Evicted entry"
            );
        }
    }

    /// Embed text under the configured timeout and check the output shape.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let duration_ms = self.config.embed_timeout_ms;
        let vector =
            tokio::time::timeout(Duration::from_millis(duration_ms), self.embedder.embed(text))
                .await
                .map_err(|_| EmbeddingError::Timeout { duration_ms })??;

        validate_embedding(&vector, self.config.embedding_dimension).map_err(|e| match e {
            ValidationError::Dimension { expected, actual } => {
                EmbeddingError::DimensionMismatch { expected, actual }
            }
            other => EmbeddingError::backend(other.to_string()),
        })?;

        Ok(vector)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Retrieval
    // ─────────────────────────────────────────────────────────────────────────

    /// Retrieve up to `k` entries ranked by composite score.
    ///
    /// Fails with [`Error::EmptyMemory`] when nothing has been ingested.
    /// Every returned entry has its access count bumped once.
    pub async fn retrieve(&self, query: QueryContext, k: usize) -> Result<Vec<RetrievedMemory>> {
        if self.state.read().await.is_empty() {
            return Err(Error::EmptyMemory);
        }

        let query_embedding = match &query.embedding {
            Some(supplied) => {
                validate_embedding(supplied, self.config.embedding_dimension)
                    .map_err(|e| Error::invalid_query(e.to_string()))?;
                supplied.clone()
            }
            None if query.text.trim().is_empty() => {
                return Err(Error::invalid_query("query needs text or an embedding"));
            }
            None => self.embed(&query.text).await?,
        };

        let now = now_utc();
        let mut state = self.state.write().await;
        if state.is_empty() {
            return Err(Error::EmptyMemory);
        }

        let mut results = self.retriever.rank(
            &state.short_term,
            &state.long_term,
            self.scorer.as_ref(),
            &query,
            &query_embedding,
            k,
            now,
        );

        for result in &mut results {
            if let Some(entry) = state.entry_mut(result.entry.id()) {
                entry.record_access();
                result.entry = entry.clone();
            }
        }

        debug!(k, returned = results.len(), "Retrieved memories");
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) without the score breakdown.
    pub async fn retrieve_entries(
        &self,
        query: QueryContext,
        k: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let results = self.retrieve(query, k).await?;
        Ok(results.into_iter().map(|r| r.entry).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection and persistence
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn stats(&self) -> MemoryStats {
        let state = self.state.read().await;
        MemoryStats {
            short_term: state.short_term.len(),
            long_term: state.long_term.len(),
            total: state.short_term.len() + state.long_term.len(),
            short_term_capacity: state.short_term.capacity(),
            long_term_capacity: state.long_term.capacity(),
            promoted: state.promoted,
            rescued: state.rescued,
            evicted_short_term: state.evicted_short_term,
            evicted_long_term: state.evicted_long_term,
        }
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.short_term.len() + state.long_term.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Snapshot every entry: short-term oldest first, then long-term in
    /// store order.
    pub async fn export(&self) -> Vec<MemoryEntry> {
        let state = self.state.read().await;
        state
            .short_term
            .all()
            .into_iter()
            .rev()
            .chain(state.long_term.all())
            .cloned()
            .collect()
    }

    /// Replace the whole memory with a snapshot.
    ///
    /// The snapshot is checked first; on [`Error::InvalidSnapshot`] the
    /// current state is left untouched. Counters restart from zero.
    pub async fn import(&self, entries: Vec<MemoryEntry>) -> Result<()> {
        self.check_snapshot(&entries)?;

        let mut fresh = MemoryState::new(&self.config)?;
        fresh.next_sequence = entries.iter().map(|e| e.sequence() + 1).max().unwrap_or(0);

        let now = now_utc();
        for entry in entries {
            match entry.tier() {
                MemoryTier::ShortTerm => {
                    fresh.short_term.insert(entry);
                }
                MemoryTier::LongTerm => {
                    fresh.long_term.insert(entry, now);
                }
            }
        }

        let mut state = self.state.write().await;
        *state = fresh;

        info!(
            short_term = state.short_term.len(),
            long_term = state.long_term.len(),
            "Imported memory snapshot"
        );
        Ok(())
    }

    fn check_snapshot(&self, entries: &[MemoryEntry]) -> Result<()> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut short_term = 0usize;
        let mut long_term = 0usize;

        for entry in entries {
            if !seen.insert(entry.id()) {
                return Err(Error::invalid_snapshot(format!("duplicate entry id {}", entry.id())));
            }

            validate_embedding(entry.embedding(), self.config.embedding_dimension)
                .map_err(|e| Error::invalid_snapshot(format!("entry {}: {}", entry.id(), e)))?;

            if !(0.0..=1.0).contains(&entry.importance()) {
                return Err(Error::invalid_snapshot(format!(
                    "entry {}: importance {} outside [0, 1]",
                    entry.id(),
                    entry.importance()
                )));
            }

            match entry.tier() {
                MemoryTier::ShortTerm => short_term += 1,
                MemoryTier::LongTerm => long_term += 1,
            }
        }

        if short_term > self.config.short_term_capacity {
            return Err(Error::invalid_snapshot(format!(
                "{} short-term entries exceed capacity {}",
                short_term, self.config.short_term_capacity
            )));
        }
        if long_term > self.config.long_term_capacity {
            return Err(Error::invalid_snapshot(format!(
                "{} long-term entries exceed capacity {}",
                long_term, self.config.long_term_capacity
            )));
        }

        Ok(())
    }
}

/// Format retrieved memories as the context block for the decision step.
///
/// One line per entry, highest ranked first.
pub fn render_context(memories: &[RetrievedMemory]) -> String {
    memories
        .iter()
        .map(|m| {
            let entry = &m.entry;
            let subject = match entry.symbol() {
                Some(symbol) => format!("{}: {}", symbol, entry.content()),
                None => entry.content().to_string(),
            };
            format!(
                "- [{} | {} | importance {:.2} | {}] {}",
                entry.tier(),
                entry.source(),
                entry.importance(),
                format_datetime(&entry.event_time()),
                subject
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventSource, NumericAttributes};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    const DIM: usize = 4;

    /// Reads importance straight from `daily_return`.
    struct FixedScorer;

    impl ScoringEngine for FixedScorer {
        fn importance(&self, event: &RawEvent) -> f64 {
            event.attributes.daily_return.unwrap_or(0.0)
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(EmbeddingError::backend("model offline").into())
        }

        fn dimensions(&self) -> usize {
            DIM
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0; DIM])
        }

        fn dimensions(&self) -> usize {
            DIM
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; DIM - 1])
        }

        fn dimensions(&self) -> usize {
            DIM
        }
    }

    fn config(short_term: usize, long_term: usize) -> MemoryConfig {
        MemoryConfig::with_capacities(short_term, long_term).with_dimension(DIM)
    }

    fn manager(config: MemoryConfig) -> MemoryManager {
        MemoryManager::new(
            config,
            Arc::new(HashingEmbedder::new(DIM)),
            Arc::new(FixedScorer),
        )
        .unwrap()
    }

    fn event(content: &str, importance: f64, embedding: Vec<f32>) -> RawEvent {
        RawEvent::new(content, EventSource::MarketData)
            .with_attributes(NumericAttributes {
                daily_return: Some(importance),
                ..Default::default()
            })
            .with_embedding(embedding)
    }

    async fn tiers(manager: &MemoryManager) -> HashMap<String, MemoryTier> {
        manager
            .export()
            .await
            .into_iter()
            .map(|e| (e.id().to_string(), e.tier()))
            .collect()
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let manager = manager(config(2, 3));

        let low = manager.ingest(event("low", 0.2, vec![0.0, 1.0, 0.0, 0.0])).await.unwrap();
        let high = manager.ingest(event("high", 0.9, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let mid = manager.ingest(event("mid", 0.3, vec![0.0, 0.0, 1.0, 0.0])).await.unwrap();

        let tiers = tiers(&manager).await;
        assert_eq!(tiers[&low], MemoryTier::ShortTerm);
        assert_eq!(tiers[&mid], MemoryTier::ShortTerm);
        assert_eq!(tiers[&high], MemoryTier::LongTerm);

        let stats = manager.stats().await;
        assert_eq!((stats.short_term, stats.long_term, stats.promoted), (2, 1, 1));
        assert_eq!((stats.short_term_capacity, stats.long_term_capacity), (2, 3));

        let results = manager
            .retrieve(QueryContext::new("q").with_embedding(vec![0.9, 0.1, 0.0, 0.0]), 3)
            .await
            .unwrap();
        assert_eq!(results[0].entry.id(), high);
        assert!(results.windows(2).all(|w| w[0].composite >= w[1].composite));
    }

    #[tokio::test]
    async fn test_cold_start_is_empty_memory() {
        let manager = manager(config(2, 3));
        let err = manager.retrieve(QueryContext::new("anything"), 5).await.unwrap_err();
        assert!(err.is_empty_memory());
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_zero_k_on_populated_memory() {
        let manager = manager(config(2, 3));
        manager.ingest(event("a", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        assert!(manager.retrieve(QueryContext::new("a"), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_fatal() {
        let err = MemoryManager::with_defaults(MemoryConfig::with_capacities(0, 10)).err().unwrap();
        assert!(matches!(err, Error::CapacityConfiguration { store: "short-term", .. }));
        assert!(!err.is_recoverable());

        let err = MemoryManager::with_defaults(MemoryConfig::with_capacities(10, 0)).err().unwrap();
        assert!(matches!(err, Error::CapacityConfiguration { store: "long-term", .. }));
    }

    #[tokio::test]
    async fn test_embedder_dimension_must_match_config() {
        let result = MemoryManager::new(
            MemoryConfig::default(),
            Arc::new(HashingEmbedder::new(DIM)),
            Arc::new(FixedScorer),
        );
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_promotion_at_threshold() {
        let manager = manager(config(5, 5));
        let id = manager.ingest(event("edge", 0.75, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(tiers(&manager).await[&id], MemoryTier::LongTerm);
    }

    #[tokio::test]
    async fn test_threshold_entry_rejected_by_full_long_term() {
        let manager = manager(config(5, 3));
        for i in 0..3 {
            manager
                .ingest(event(&format!("max {}", i), 1.0, vec![1.0, 0.0, 0.0, 0.0]))
                .await
                .unwrap();
        }

        let id = manager.ingest(event("edge", 0.75, vec![0.0, 1.0, 0.0, 0.0])).await.unwrap();

        let tiers = tiers(&manager).await;
        assert!(!tiers.contains_key(&id));
        assert_eq!(tiers.len(), 3);
        assert!(tiers.values().all(|t| *t == MemoryTier::LongTerm));

        let stats = manager.stats().await;
        assert_eq!(stats.promoted, 4);
        assert_eq!(stats.evicted_long_term, 1);
    }

    #[tokio::test]
    async fn test_rescue_on_eviction() {
        let manager = manager(config(2, 5));
        manager.ingest(event("keep", 0.6, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let rescued = manager
            .ingest(event("rescue me", 0.55, vec![0.0, 1.0, 0.0, 0.0]))
            .await
            .unwrap();
        manager.ingest(event("noise", 0.1, vec![0.0, 0.0, 1.0, 0.0])).await.unwrap();

        assert_eq!(tiers(&manager).await[&rescued], MemoryTier::LongTerm);
        let stats = manager.stats().await;
        assert_eq!((stats.short_term, stats.long_term, stats.rescued), (2, 1, 1));
        assert_eq!(stats.evicted_short_term, 0);
    }

    #[tokio::test]
    async fn test_eviction_without_rescue_drops_entry() {
        let mut cfg = config(2, 5);
        cfg.rescue_on_eviction = false;
        let manager = manager(cfg);

        manager.ingest(event("keep", 0.6, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let dropped = manager.ingest(event("drop", 0.55, vec![0.0, 1.0, 0.0, 0.0])).await.unwrap();
        manager.ingest(event("noise", 0.1, vec![0.0, 0.0, 1.0, 0.0])).await.unwrap();

        assert!(!tiers(&manager).await.contains_key(&dropped));
        let stats = manager.stats().await;
        assert_eq!((stats.short_term, stats.long_term, stats.evicted_short_term), (2, 0, 1));
    }

    #[tokio::test]
    async fn test_invalid_events_leave_state_untouched() {
        let manager = manager(config(2, 3));
        manager.ingest(event("ok", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let before = manager.export().await;

        let err = manager.ingest(event("   ", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));

        let err = manager.ingest(event("wrong dim", 0.1, vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));

        let bad_sentiment =
            RawEvent::new("CPI surprise", EventSource::News).with_attributes(NumericAttributes {
                sentiment: Some(3.0),
                ..Default::default()
            });
        assert!(matches!(
            manager.ingest(bad_sentiment).await,
            Err(Error::InvalidEvent { .. })
        ));

        assert_eq!(manager.export().await, before);
    }

    #[tokio::test]
    async fn test_embedder_failures_abort_ingest() {
        let failing =
            MemoryManager::new(config(2, 3), Arc::new(FailingEmbedder), Arc::new(FixedScorer))
                .unwrap();
        let err = failing.ingest(RawEvent::new("text", EventSource::News)).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(EmbeddingError::Backend { .. })));
        assert!(failing.is_empty().await);

        let short =
            MemoryManager::new(config(2, 3), Arc::new(ShortEmbedder), Arc::new(FixedScorer))
                .unwrap();
        let err = short.ingest(RawEvent::new("text", EventSource::News)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            Error::from(EmbeddingError::DimensionMismatch {
                expected: DIM,
                actual: DIM - 1
            })
            .to_string()
        );
        assert_eq!(short.len().await, 0);
    }

    #[tokio::test]
    async fn test_embedder_timeout() {
        let mut cfg = config(2, 3);
        cfg.embed_timeout_ms = 20;
        let manager =
            MemoryManager::new(cfg, Arc::new(SlowEmbedder), Arc::new(FixedScorer)).unwrap();

        let err = manager.ingest(RawEvent::new("slow", EventSource::News)).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(EmbeddingError::Timeout { duration_ms: 20 })));
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let manager = manager(config(2, 3));
        manager.ingest(event("a", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();

        let err = manager
            .retrieve(QueryContext::new("q").with_embedding(vec![1.0]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));

        let err = manager.retrieve(QueryContext::new("  "), 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn test_access_count_bumped_once_per_retrieval() {
        let manager = manager(config(3, 3));
        let hit = manager.ingest(event("hit", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        manager.ingest(event("miss", 0.1, vec![-1.0, 0.0, 0.0, 0.0])).await.unwrap();

        let query = QueryContext::new("q").with_embedding(vec![1.0, 0.0, 0.0, 0.0]);
        manager.retrieve(query.clone(), 1).await.unwrap();
        let results = manager.retrieve(query, 1).await.unwrap();

        assert_eq!(results[0].entry.id(), hit);
        assert_eq!(results[0].entry.access_count(), 2);

        let counts: HashMap<String, u32> = manager
            .export()
            .await
            .into_iter()
            .map(|e| (e.id().to_string(), e.access_count()))
            .collect();
        assert_eq!(counts[&hit], 2);
        assert_eq!(counts.values().sum::<u32>(), 2);
    }

    #[tokio::test]
    async fn test_source_filter() {
        let manager = manager(config(3, 3));
        manager.ingest(event("price", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let news = manager
            .ingest(
                RawEvent::new("RBI holds rates", EventSource::News)
                    .with_embedding(vec![0.0, 1.0, 0.0, 0.0]),
            )
            .await
            .unwrap();

        let results = manager
            .retrieve_entries(
                QueryContext::new("q")
                    .with_embedding(vec![1.0, 0.0, 0.0, 0.0])
                    .with_sources(vec![EventSource::News]),
                5,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), news);
    }

    #[tokio::test]
    async fn test_symbol_filter() {
        let manager = manager(config(3, 3));
        manager
            .ingest(event("NIFTY flat", 0.1, vec![1.0, 0.0, 0.0, 0.0]).with_symbol("NIFTY"))
            .await
            .unwrap();
        let infy = manager
            .ingest(event("INFY guidance cut", 0.9, vec![0.0, 1.0, 0.0, 0.0]).with_symbol("INFY"))
            .await
            .unwrap();
        manager.ingest(event("untagged", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();

        let results = manager
            .retrieve_entries(
                QueryContext::new("q")
                    .with_embedding(vec![1.0, 0.0, 0.0, 0.0])
                    .with_symbols(["INFY"]),
                5,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), infy);
        assert_eq!(results[0].tier(), MemoryTier::LongTerm);
    }

    #[tokio::test]
    async fn test_text_queries_use_embedder() {
        let manager = MemoryManager::with_defaults(MemoryConfig::default()).unwrap();
        manager
            .ingest(RawEvent::new("RBI keeps repo rate unchanged", EventSource::News))
            .await
            .unwrap();
        manager
            .ingest(RawEvent::new("Infosys wins cloud contract", EventSource::News))
            .await
            .unwrap();

        let results = manager.retrieve(QueryContext::new("repo rate decision"), 1).await.unwrap();
        assert_eq!(results[0].entry.content(), "RBI keeps repo rate unchanged");
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = manager(config(3, 3));
        for (i, importance) in [0.2, 0.9, 0.4, 0.8, 0.1].into_iter().enumerate() {
            let mut embedding = vec![0.0; DIM];
            embedding[i % DIM] = 1.0;
            source
                .ingest(event(&format!("event {}", i), importance, embedding))
                .await
                .unwrap();
        }
        source
            .retrieve(QueryContext::new("q").with_embedding(vec![1.0, 0.0, 0.0, 0.0]), 2)
            .await
            .unwrap();

        let snapshot = source.export().await;
        let restored = manager(config(3, 3));
        restored.import(snapshot.clone()).await.unwrap();

        assert_eq!(restored.export().await, snapshot);
        let (a, b) = (source.stats().await, restored.stats().await);
        assert_eq!((a.short_term, a.long_term), (b.short_term, b.long_term));

        // Sequence numbers continue after the imported maximum
        let next = restored.ingest(event("after", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let max_seq = snapshot.iter().map(|e| e.sequence()).max().unwrap();
        let after = restored.export().await.into_iter().find(|e| e.id() == next).unwrap();
        assert!(after.sequence() > max_seq);
    }

    #[tokio::test]
    async fn test_invalid_snapshot_keeps_previous_state() {
        let manager = manager(config(2, 3));
        manager.ingest(event("a", 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let before = manager.export().await;

        let mut duplicated = before.clone();
        duplicated.extend(before.clone());
        assert!(matches!(
            manager.import(duplicated).await,
            Err(Error::InvalidSnapshot { .. })
        ));

        let other =
            MemoryManager::with_defaults(MemoryConfig::default().with_dimension(8)).unwrap();
        other.ingest(RawEvent::new("eight dims", EventSource::News)).await.unwrap();
        assert!(matches!(
            manager.import(other.export().await).await,
            Err(Error::InvalidSnapshot { .. })
        ));

        let big = self::manager(config(5, 3));
        for i in 0..4 {
            big.ingest(event(&format!("s{}", i), 0.1, vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        }
        assert!(matches!(
            manager.import(big.export().await).await,
            Err(Error::InvalidSnapshot { .. })
        ));

        assert_eq!(manager.export().await, before);
    }

    #[tokio::test]
    async fn test_randomized_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let manager = manager(config(3, 5));
        let mut seen_long_term: HashSet<String> = HashSet::new();

        for step in 0..300 {
            let embedding: Vec<f32> = (0..DIM).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
            let importance = rng.gen_range(0.0..1.0);
            manager
                .ingest(event(&format!("event {}", step), importance, embedding))
                .await
                .unwrap();

            if step % 7 == 0 {
                let query: Vec<f32> = (0..DIM).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
                let k = rng.gen_range(1..6);
                let results = manager
                    .retrieve(QueryContext::new("q").with_embedding(query), k)
                    .await
                    .unwrap();
                assert!(results.len() <= k);
                assert!(results.windows(2).all(|w| w[0].composite >= w[1].composite));
            }

            let snapshot = manager.export().await;
            let short = snapshot.iter().filter(|e| e.tier() == MemoryTier::ShortTerm).count();
            let long = snapshot.len() - short;
            assert!(short <= 3, "step {}: short-term holds {}", step, short);
            assert!(long <= 5, "step {}: long-term holds {}", step, long);

            let ids: HashSet<&str> = snapshot.iter().map(|e| e.id()).collect();
            assert_eq!(ids.len(), snapshot.len(), "step {}: duplicate ids", step);

            for entry in &snapshot {
                match entry.tier() {
                    MemoryTier::LongTerm => {
                        seen_long_term.insert(entry.id().to_string());
                    }
                    MemoryTier::ShortTerm => {
                        assert!(
                            !seen_long_term.contains(entry.id()),
                            "step {}: tier reverted",
                            step
                        );
                    }
                }
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_and_retrieve() {
        let manager = Arc::new(manager(config(3, 5)));
        let mut ingests = Vec::new();
        let mut retrievals = Vec::new();

        for i in 0..200u32 {
            let writer = Arc::clone(&manager);
            ingests.push(tokio::spawn(async move {
                let importance = f64::from(i % 10) / 10.0;
                let embedding = vec![1.0, i as f32, 0.0, 0.0];
                writer
                    .ingest(event(&format!("event {}", i), importance, embedding))
                    .await
            }));

            if i % 4 == 0 {
                let reader = Arc::clone(&manager);
                retrievals.push(tokio::spawn(async move {
                    let query = QueryContext::new("q").with_embedding(vec![1.0, 0.0, 0.0, 0.0]);
                    reader.retrieve(query, 4).await
                }));
            }
        }

        let mut ids = HashSet::new();
        for task in ingests {
            let id = task.await.unwrap().unwrap();
            assert!(ids.insert(id), "duplicate id");
        }
        assert_eq!(ids.len(), 200);

        for task in retrievals {
            let results = match task.await.unwrap() {
                Ok(results) => results,
                Err(e) if e.is_empty_memory() => continue,
                Err(e) => panic!("retrieve failed: {}", e),
            };
            assert!(results.len() <= 4);
            assert!(results.windows(2).all(|w| w[0].composite >= w[1].composite));

            // Each entry is seen with all of its fields from one ingest
            for r in &results {
                let n: u32 = r.entry.content().trim_start_matches("event ").parse().unwrap();
                assert_eq!(r.entry.embedding(), [1.0, n as f32, 0.0, 0.0].as_slice());
                assert_eq!(r.entry.importance(), f64::from(n % 10) / 10.0);
                assert!(ids.contains(r.entry.id()));
            }
        }

        let stats = manager.stats().await;
        assert_eq!(stats.short_term, 3);
        assert_eq!(stats.long_term, 5);
        let evicted = stats.evicted_short_term + stats.evicted_long_term;
        assert_eq!(stats.short_term + stats.long_term + evicted as usize, 200);

        let snapshot = manager.export().await;
        let unique: HashSet<&str> = snapshot.iter().map(|e| e.id()).collect();
        assert_eq!(unique.len(), snapshot.len());
        assert!(snapshot.iter().all(|e| ids.contains(e.id())));
    }

    #[tokio::test]
    async fn test_render_context() {
        let manager = manager(config(2, 3));
        manager
            .ingest(event("NIFTY breaks 22000", 0.9, vec![1.0, 0.0, 0.0, 0.0]).with_symbol("NIFTY"))
            .await
            .unwrap();

        let results = manager
            .retrieve(QueryContext::new("q").with_embedding(vec![1.0, 0.0, 0.0, 0.0]), 1)
            .await
            .unwrap();
        let rendered = render_context(&results);
        assert!(rendered.starts_with("- [long_term | market_data | importance 0.90 |"));
        assert!(rendered.ends_with("NIFTY: NIFTY breaks 22000"));
        assert_eq!(render_context(&[]), "");
    }
}
