//! Importance and relevance scoring.
//!
//! Importance is query-independent: how consequential an event is, judged
//! from the surprise in its numeric attributes and weighted by provenance.
//! Relevance is query-dependent: the similarity between an entry's
//! embedding and the query embedding.

use crate::config::{ScoringConfig, SourceWeight};
use crate::types::{clamp_unit, EventSource, MemoryEntry, NumericAttributes, RawEvent};

use super::embeddings::{cosine_similarity, normalize_similarity};

/// Pluggable scoring capability.
///
/// `importance` must be deterministic for the same content, attributes and
/// provenance. Callers still clamp the result.
pub trait ScoringEngine: Send + Sync {
    /// Importance of an event in [0, 1].
    fn importance(&self, event: &RawEvent) -> f64;

    /// Relevance of an entry to a query embedding in [0, 1].
    fn relevance(&self, entry: &MemoryEntry, query: &[f32]) -> f64 {
        relevance(entry.embedding(), query)
    }
}

/// Pure relevance function: cosine similarity mapped onto [0, 1].
pub fn relevance(embedding: &[f32], query: &[f32]) -> f64 {
    normalize_similarity(cosine_similarity(embedding, query))
}

/// Default scorer for market, news, technical and trade events.
///
/// Signals:
/// - volume spike above the moving average
/// - large absolute daily return
/// - RSI in oversold/overbought territory
/// - divergence between short and long moving averages
/// - news sentiment magnitude (capped)
///
/// The signal sum is mapped through the source's baseline and multiplier.
#[derive(Debug, Clone, Default)]
pub struct MarketEventScorer {
    config: ScoringConfig,
}

impl MarketEventScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Raw signal strength before provenance weighting.
    pub fn signal(&self, attrs: &NumericAttributes) -> f64 {
        let cfg = &self.config;
        let mut signal = 0.0;

        if let (Some(volume), Some(volume_ma)) = (attrs.volume, attrs.volume_ma) {
            if volume_ma > 0.0 && volume > volume_ma * cfg.volume_spike_ratio {
                signal += cfg.volume_spike_weight;
            }
        }

        if let Some(ret) = attrs.daily_return {
            if ret.abs() > cfg.large_move_threshold {
                signal += cfg.large_move_weight;
            }
        }

        if let Some(rsi) = attrs.rsi {
            if rsi < cfg.rsi_oversold || rsi > cfg.rsi_overbought {
                signal += cfg.rsi_weight;
            }
        }

        if let (Some(short), Some(long)) = (attrs.ma_short, attrs.ma_long) {
            if long != 0.0 && ((short - long) / long).abs() >= cfg.trend_gap {
                signal += cfg.trend_weight;
            }
        }

        if let Some(sentiment) = attrs.sentiment {
            signal += sentiment.abs().min(cfg.sentiment_cap);
        }

        signal
    }

    fn weight_for(&self, source: EventSource) -> SourceWeight {
        let p = &self.config.provenance;
        match source {
            EventSource::MarketData => p.market_data,
            EventSource::News => p.news,
            EventSource::TechnicalIndicator => p.technical_indicator,
            EventSource::Trade => p.trade,
        }
    }
}

impl ScoringEngine for MarketEventScorer {
    fn importance(&self, event: &RawEvent) -> f64 {
        let weight = self.weight_for(event.source);
        let signal = self.signal(&event.attributes);
        clamp_unit(weight.baseline + weight.multiplier * signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn market(attrs: NumericAttributes) -> RawEvent {
        RawEvent::new("RELIANCE tick", EventSource::MarketData).with_attributes(attrs)
    }

    #[test]
    fn test_quiet_tick_scores_zero() {
        let scorer = MarketEventScorer::default();
        let event = market(NumericAttributes {
            volume: Some(1_000.0),
            volume_ma: Some(1_000.0),
            daily_return: Some(0.01),
            rsi: Some(50.0),
            ..Default::default()
        });
        assert_eq!(scorer.importance(&event), 0.0);
    }

    #[test]
    fn test_signals_accumulate() {
        let scorer = MarketEventScorer::default();

        let spike = market(NumericAttributes {
            volume: Some(2_000.0),
            volume_ma: Some(1_000.0),
            ..Default::default()
        });
        assert!((scorer.importance(&spike) - 0.3).abs() < 1e-9);

        let everything = market(NumericAttributes {
            volume: Some(2_000.0),
            volume_ma: Some(1_000.0),
            daily_return: Some(-0.07),
            rsi: Some(22.0),
            ma_short: Some(110.0),
            ma_long: Some(100.0),
            ..Default::default()
        });
        // 0.3 + 0.2 + 0.2 + 0.3 = 1.0
        assert!((scorer.importance(&everything) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_provenance_weighting() {
        let scorer = MarketEventScorer::default();

        let news = RawEvent::new("Budget cuts capital gains tax", EventSource::News)
            .with_attributes(NumericAttributes {
                sentiment: Some(-0.9),
                ..Default::default()
            });
        // baseline 0.5 + capped sentiment 0.4
        assert!((scorer.importance(&news) - 0.9).abs() < 1e-9);

        let trade = RawEvent::new("Bought 10 HDFCBANK @ 1500", EventSource::Trade);
        assert!((scorer.importance(&trade) - 0.8).abs() < 1e-9);

        let same_attrs_as_market = RawEvent::new("RSI 80", EventSource::TechnicalIndicator)
            .with_attributes(NumericAttributes {
                rsi: Some(80.0),
                ..Default::default()
            });
        assert!((scorer.importance(&same_attrs_as_market) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_importance_is_clamped_and_idempotent() {
        let mut config = ScoringConfig::default();
        config.provenance.market_data = SourceWeight::new(0.5, 2.0);
        let scorer = MarketEventScorer::new(config);

        let event = market(NumericAttributes {
            daily_return: Some(0.2),
            rsi: Some(90.0),
            ..Default::default()
        })
        .with_timestamp(Utc::now());

        let first = scorer.importance(&event);
        assert_eq!(first, 1.0);
        assert_eq!(scorer.importance(&event), first);
    }

    #[test]
    fn test_zero_volume_ma_is_not_a_spike() {
        let scorer = MarketEventScorer::default();
        let event = market(NumericAttributes {
            volume: Some(10.0),
            volume_ma: Some(0.0),
            ..Default::default()
        });
        assert_eq!(scorer.importance(&event), 0.0);
    }

    #[test]
    fn test_relevance_range() {
        assert!((relevance(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((relevance(&[1.0, 0.0], &[0.0, 1.0]) - 0.5).abs() < 1e-6);
        assert!(relevance(&[1.0, 0.0], &[-1.0, 0.0]).abs() < 1e-6);
    }
}
