//! Memory Configuration
//!
//! Defines the tunable options of the layered memory. Every field has a
//! default so partial TOML/JSON documents deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Memory system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum short-term entries (default: 10)
    pub short_term_capacity: usize,

    /// Maximum long-term entries (default: 100)
    pub long_term_capacity: usize,

    /// Importance at or above which an entry is promoted (default: 0.75)
    pub relevance_threshold: f64,

    /// Blend of relevance, importance and recency used for ranking
    pub retrieval_weights: RetrievalWeights,

    /// Blend used to pick the long-term eviction victim
    pub eviction_weights: EvictionWeights,

    /// Process-wide embedding dimensionality (default: 384)
    pub embedding_dimension: usize,

    /// Half-life of the retrieval recency decay in hours (default: 24)
    pub recency_half_life_hours: f64,

    /// Initial long-term search width as a multiple of k (default: 4)
    pub candidate_multiplier: usize,

    /// Embedder call timeout in milliseconds (default: 5000)
    pub embed_timeout_ms: u64,

    /// Move the short-term eviction victim to long-term instead of dropping
    /// it, when it is important enough (default: true)
    pub rescue_on_eviction: bool,

    /// Minimum importance for a rescue (default: 0.5)
    pub rescue_min_importance: f64,

    /// Importance scoring parameters
    pub scoring: ScoringConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 10,
            long_term_capacity: 100,
            relevance_threshold: 0.75,
            retrieval_weights: RetrievalWeights::default(),
            eviction_weights: EvictionWeights::default(),
            embedding_dimension: 384,
            recency_half_life_hours: 24.0,
            candidate_multiplier: 4,
            embed_timeout_ms: 5000,
            rescue_on_eviction: true,
            rescue_min_importance: 0.5,
            scoring: ScoringConfig::default(),
        }
    }
}

/// Weights of the retrieval composite score (α, β, γ).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalWeights {
    pub relevance: f64,
    pub importance: f64,
    pub recency: f64,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            relevance: 0.5,
            importance: 0.3,
            recency: 0.2,
        }
    }
}

/// Weights of the long-term eviction score (w1, w2, w3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionWeights {
    pub importance: f64,
    pub recency: f64,
    pub access: f64,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        Self {
            importance: 0.6,
            recency: 0.25,
            access: 0.15,
        }
    }
}

/// Importance scoring parameters for market, news, technical and trade events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Volume above `volume_ma * volume_spike_ratio` counts as a spike
    pub volume_spike_ratio: f64,
    pub volume_spike_weight: f64,

    /// Absolute daily return above which a move counts as large
    pub large_move_threshold: f64,
    pub large_move_weight: f64,

    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_weight: f64,

    /// Relative gap between short and long moving averages that counts as a trend
    pub trend_gap: f64,
    pub trend_weight: f64,

    /// Cap on the contribution of |sentiment|
    pub sentiment_cap: f64,

    pub provenance: ProvenanceWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            volume_spike_ratio: 1.5,
            volume_spike_weight: 0.3,
            large_move_threshold: 0.05,
            large_move_weight: 0.2,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_weight: 0.2,
            trend_gap: 0.01,
            trend_weight: 0.3,
            sentiment_cap: 0.4,
            provenance: ProvenanceWeights::default(),
        }
    }
}

/// Per-source baseline and multiplier applied to the raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWeight {
    pub baseline: f64,
    pub multiplier: f64,
}

impl SourceWeight {
    pub const fn new(baseline: f64, multiplier: f64) -> Self {
        Self { baseline, multiplier }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceWeights {
    pub market_data: SourceWeight,
    pub news: SourceWeight,
    pub technical_indicator: SourceWeight,
    pub trade: SourceWeight,
}

impl Default for ProvenanceWeights {
    fn default() -> Self {
        Self {
            market_data: SourceWeight::new(0.0, 1.0),
            news: SourceWeight::new(0.5, 1.0),
            technical_indicator: SourceWeight::new(0.0, 1.0),
            // Executed trades are always worth remembering
            trade: SourceWeight::new(0.8, 1.0),
        }
    }
}

impl MemoryConfig {
    /// Create a config with the given store capacities
    pub fn with_capacities(short_term: usize, long_term: usize) -> Self {
        Self {
            short_term_capacity: short_term,
            long_term_capacity: long_term,
            ..Default::default()
        }
    }

    /// Set the embedding dimension
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Set the promotion threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    /// Reject capacities that can never hold an entry.
    pub fn check_capacities(&self) -> Result<()> {
        if self.short_term_capacity == 0 {
            return Err(Error::CapacityConfiguration {
                store: "short-term",
                capacity: self.short_term_capacity,
            });
        }
        if self.long_term_capacity == 0 {
            return Err(Error::CapacityConfiguration {
                store: "long-term",
                capacity: self.long_term_capacity,
            });
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.check_capacities()?;

        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(Error::invalid_config(
                "relevance_threshold",
                "must be between 0 and 1",
            ));
        }

        if self.embedding_dimension == 0 {
            return Err(Error::invalid_config(
                "embedding_dimension",
                "must be greater than 0",
            ));
        }

        let retrieval = self.retrieval_weights;
        check_weights(
            "retrieval_weights",
            &[retrieval.relevance, retrieval.importance, retrieval.recency],
        )?;

        let eviction = self.eviction_weights;
        check_weights(
            "eviction_weights",
            &[eviction.importance, eviction.recency, eviction.access],
        )?;

        // Rejects NaN and infinity as well
        if !self.recency_half_life_hours.is_finite() || self.recency_half_life_hours <= 0.0 {
            return Err(Error::invalid_config(
                "recency_half_life_hours",
                "must be greater than 0",
            ));
        }

        if self.candidate_multiplier == 0 {
            return Err(Error::invalid_config(
                "candidate_multiplier",
                "must be at least 1",
            ));
        }

        if self.embed_timeout_ms == 0 {
            return Err(Error::invalid_config(
                "embed_timeout_ms",
                "must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.rescue_min_importance) {
            return Err(Error::invalid_config(
                "rescue_min_importance",
                "must be between 0 and 1",
            ));
        }

        Ok(())
    }
}

fn check_weights(field: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(Error::invalid_config(field, "weights must be finite and non-negative"));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(Error::invalid_config(field, "weights must not all be zero"));
    }
    Ok(())
}
