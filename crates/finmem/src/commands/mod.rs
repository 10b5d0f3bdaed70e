//! Command implementations for the finmem CLI.
//!
//! Every command opens the memory from the configured snapshot, and the
//! mutating ones write it back.

pub mod config;
pub mod ingest;
pub mod recall;
pub mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use finmem_core::memory::{Embedder, HashingEmbedder, MarketEventScorer};
use finmem_core::MemoryManager;

use crate::config::{Config, EmbedderBackend};
use crate::snapshot::Snapshot;

/// Build a manager for the configured embedder backend.
pub fn build_manager(config: &Config) -> Result<MemoryManager> {
    let memory = config.memory.clone();
    let scorer = Arc::new(MarketEventScorer::new(memory.scoring.clone()));

    let embedder: Arc<dyn Embedder> = match config.embedder.backend {
        EmbedderBackend::Hashing => Arc::new(HashingEmbedder::new(memory.embedding_dimension)),
        #[cfg(feature = "embeddings")]
        EmbedderBackend::Fastembed => Arc::new(finmem_core::memory::FastEmbedder::new()),
        #[cfg(not(feature = "embeddings"))]
        EmbedderBackend::Fastembed => {
            anyhow::bail!(
                "The fastembed backend requires building finmem with --features embeddings"
            )
        }
    };

    MemoryManager::new(memory, embedder, scorer).context("Failed to initialize memory")
}

/// Build a manager and restore the last snapshot, if any.
pub async fn open_memory(config: &Config) -> Result<MemoryManager> {
    let manager = build_manager(config)?;
    let path = config.snapshot_path();

    if let Some(snapshot) = Snapshot::load(&path)? {
        manager.import(snapshot.entries).await.with_context(|| {
            format!("Snapshot {} does not fit the current configuration", path.display())
        })?;
    }

    Ok(manager)
}

/// Write the manager's state to the snapshot path.
pub async fn persist(manager: &MemoryManager, config: &Config) -> Result<PathBuf> {
    config.ensure_dirs()?;
    let path = config.snapshot_path();
    Snapshot::new(manager.export().await).save(&path)?;
    Ok(path)
}
