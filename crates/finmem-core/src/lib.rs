//! finmem core - layered memory for LLM trading agents.
//!
//! Ingests market, news, technical-indicator and trade events, scores them
//! for importance, keeps them in a short-term buffer, consolidates the
//! consequential ones into long-term memory and retrieves a ranked context
//! window for the decision step.
//!
//! # Modules
//!
//! - **memory** - embedders, scoring, both stores, consolidation, retrieval
//!   and the [`MemoryManager`] façade
//! - **config** - tunable capacities, thresholds and weights
//! - **types** - events, entries, queries and stats
//! - **error** - error taxonomy
//! - **utils** - hashing, time and validation helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use finmem_core::{EventSource, MemoryConfig, MemoryManager, QueryContext, RawEvent};
//!
//! async fn example() -> finmem_core::Result<()> {
//!     let manager = MemoryManager::with_defaults(MemoryConfig::default())?;
//!
//!     manager
//!         .ingest(RawEvent::new("TCS beats Q3 estimates", EventSource::News).with_symbol("TCS"))
//!         .await?;
//!
//!     match manager.retrieve(QueryContext::new("IT sector earnings"), 5).await {
//!         Ok(memories) => println!("{}", finmem_core::memory::render_context(&memories)),
//!         Err(e) if e.is_empty_memory() => println!("no context yet"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod types;
pub mod utils;

pub use config::{EvictionWeights, MemoryConfig, RetrievalWeights, ScoringConfig};
pub use error::{EmbeddingError, Error, Result};
pub use memory::MemoryManager;
pub use types::{
    EventSource, MemoryEntry, MemoryStats, MemoryTier, NumericAttributes, QueryContext, RawEvent,
    RetrievedMemory,
};
