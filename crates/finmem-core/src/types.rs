//! Shared types for the layered market memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Tiers and provenance
// ─────────────────────────────────────────────────────────────────────────────

/// Storage tier of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    ShortTerm,
    LongTerm,
}

impl MemoryTier {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemoryTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" | "short" => Ok(MemoryTier::ShortTerm),
            "long_term" | "long" => Ok(MemoryTier::LongTerm),
            _ => Err(format!("Invalid memory tier: {}", s)),
        }
    }
}

/// Provenance tag of an event. Opaque to storage, used for scoring and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    MarketData,
    News,
    TechnicalIndicator,
    Trade,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::News => "news",
            Self::TechnicalIndicator => "technical_indicator",
            Self::Trade => "trade",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market_data" | "market" | "price" => Ok(EventSource::MarketData),
            "news" => Ok(EventSource::News),
            "technical_indicator" | "technical" => Ok(EventSource::TechnicalIndicator),
            "trade" => Ok(EventSource::Trade),
            _ => Err(format!("Invalid event source: {}", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw events from the feed
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric attributes attached to an event. Every field is optional; absent
/// signals simply do not contribute to importance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumericAttributes {
    /// Fractional daily return (0.05 = +5%).
    pub daily_return: Option<f64>,
    pub volume: Option<f64>,
    /// Moving average of volume used to detect spikes.
    pub volume_ma: Option<f64>,
    pub rsi: Option<f64>,
    /// Short moving average of price (20 day).
    pub ma_short: Option<f64>,
    /// Long moving average of price (50 day).
    pub ma_long: Option<f64>,
    /// News sentiment polarity in [-1, 1].
    pub sentiment: Option<f64>,
}

/// An event as supplied by the market/news feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub content: String,
    #[serde(default)]
    pub attributes: NumericAttributes,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Precomputed embedding. When present the embedder is skipped.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl RawEvent {
    /// Create an event stamped with the current time
    pub fn new(content: impl Into<String>, source: EventSource) -> Self {
        Self {
            content: content.into(),
            attributes: NumericAttributes::default(),
            source,
            timestamp: Utc::now(),
            symbol: None,
            embedding: None,
        }
    }

    pub fn with_attributes(mut self, attributes: NumericAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory entries
// ─────────────────────────────────────────────────────────────────────────────

/// The atomic unit of memory.
///
/// Identity, content, embedding and creation time never change once the
/// entry exists. Importance and access count are mutated in place, and the
/// tier moves from short-term to long-term at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    id: String,
    content: String,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
    /// Ingestion order, used to break ties between identical timestamps.
    sequence: u64,
    importance: f64,
    access_count: u32,
    tier: MemoryTier,
    source: EventSource,
    #[serde(default)]
    symbol: Option<String>,
    event_time: DateTime<Utc>,
    #[serde(default)]
    attributes: NumericAttributes,
}

impl MemoryEntry {
    /// Build a fresh short-term entry from an event that has already been
    /// embedded and scored.
    pub fn new(
        id: impl Into<String>,
        event: RawEvent,
        embedding: Vec<f32>,
        importance: f64,
        created_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            id: id.into(),
            content: event.content,
            embedding,
            created_at,
            sequence,
            importance: clamp_unit(importance),
            access_count: 0,
            tier: MemoryTier::ShortTerm,
            source: event.source,
            symbol: event.symbol,
            event_time: event.timestamp,
            attributes: event.attributes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    pub fn access_count(&self) -> u32 {
        self.access_count
    }

    pub fn tier(&self) -> MemoryTier {
        self.tier
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn attributes(&self) -> &NumericAttributes {
        &self.attributes
    }

    /// Age in fractional hours relative to `now`. Never negative.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.created_at).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }

    /// Recency ordering key: later `created_at` first, then later sequence.
    pub fn is_newer_than(&self, other: &MemoryEntry) -> bool {
        (self.created_at, self.sequence) > (other.created_at, other.sequence)
    }

    pub(crate) fn record_access(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
    }

    /// One-way move into the long-term tier.
    pub(crate) fn mark_long_term(&mut self) {
        self.tier = MemoryTier::LongTerm;
    }
}

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Query for a retrieval cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// Free-text description of the current situation.
    pub text: String,
    /// Precomputed query embedding. When absent, `text` is embedded.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Restrict candidates to these provenance tags.
    #[serde(default)]
    pub sources: Option<Vec<EventSource>>,
    /// Restrict candidates to these tickers. Entries without a symbol never match.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

impl QueryContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_sources(mut self, sources: Vec<EventSource>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    /// Whether an entry passes the provenance and symbol filters.
    ///
    /// Symbols compare case-insensitively.
    pub fn accepts(&self, entry: &MemoryEntry) -> bool {
        let source_ok = match &self.sources {
            Some(sources) => sources.contains(&entry.source()),
            None => true,
        };
        let symbol_ok = match (&self.symbols, entry.symbol()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(symbols), Some(symbol)) => symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol)),
        };
        source_ok && symbol_ok
    }
}

/// A retrieved entry with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedMemory {
    pub entry: MemoryEntry,
    pub relevance: f64,
    pub recency: f64,
    pub composite: f64,
}

/// Counters describing the memory state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub short_term: usize,
    pub long_term: usize,
    pub total: usize,
    pub short_term_capacity: usize,
    pub long_term_capacity: usize,
    /// Entries moved to long-term because they crossed the threshold.
    pub promoted: u64,
    /// Entries moved to long-term on their way out of a full short-term store.
    pub rescued: u64,
    pub evicted_short_term: u64,
    pub evicted_long_term: u64,
}
