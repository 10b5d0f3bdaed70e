//! Layered market-event memory.
//!
//! Two bounded tiers with eager consolidation between them:
//!
//! - **Short-term**: the most recent raw events. Lossy; when full the least
//!   important entry is evicted (or rescued into long-term).
//! - **Long-term**: consolidated high-importance events, searchable by
//!   embedding similarity and evicted by a blend of importance, age and
//!   access frequency.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        MemoryManager                            │
//! │   ingest(event)                          retrieve(query, k)     │
//! │       │                                         │               │
//! │  ┌────▼─────┐  ┌──────────────┐         ┌───────▼────────┐      │
//! │  │ Embedder │─▶│ScoringEngine │         │   Retriever    │      │
//! │  └──────────┘  └──────┬───────┘         └───┬────────┬───┘      │
//! │                ┌──────▼──────┐ promote  ┌───▼───┐ ┌──▼──────┐   │
//! │                │ Short-Term  │─────────▶│ Long- │ │ Short-  │   │
//! │                │ (C_s = 10)  │ (policy) │ Term  │ │ Term    │   │
//! │                └─────────────┘          └───────┘ └─────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use finmem_core::memory::{render_context, MemoryManager};
//! use finmem_core::{EventSource, MemoryConfig, QueryContext, RawEvent};
//!
//! let manager = MemoryManager::with_defaults(MemoryConfig::default())?;
//! manager.ingest(RawEvent::new("RBI holds repo rate at 6.5%", EventSource::News)).await?;
//!
//! let memories = manager.retrieve(QueryContext::new("rate outlook"), 5).await?;
//! println!("{}", render_context(&memories));
//! ```

pub mod embeddings;

mod consolidation;
mod long_term;
mod manager;
mod retrieval;
mod scoring;
mod short_term;

pub use consolidation::{promote, ConsolidationPolicy, PromotionOutcome, PromotionReason};
pub use embeddings::{cosine_similarity, normalize_similarity, Embedder, HashingEmbedder};
#[cfg(feature = "embeddings")]
pub use embeddings::FastEmbedder;
pub use long_term::LongTermStore;
pub use manager::{render_context, MemoryManager};
pub use retrieval::Retriever;
pub use scoring::{relevance, MarketEventScorer, ScoringEngine};
pub use short_term::ShortTermStore;
