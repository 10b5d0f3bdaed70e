//! Embedding Adapters
//!
//! Maps event descriptions to fixed-length vectors for semantic comparison.
//! The memory only depends on the [`Embedder`] trait; two backends ship
//! with the crate:
//!
//! - [`HashingEmbedder`]: deterministic signed feature hashing. No model,
//!   no I/O, identical output across processes.
//! - `FastEmbedder` (feature `embeddings`): local all-MiniLM-L6-v2
//!   inference via `fastembed`, 384 dimensions, lazily loaded.
//!
//! # Usage
//!
//! ```ignore
//! use finmem_core::memory::embeddings::{cosine_similarity, Embedder, HashingEmbedder};
//!
//! let embedder = HashingEmbedder::new(384);
//! let a = embedder.embed("RBI holds repo rate").await?;
//! let b = embedder.embed("repo rate unchanged by RBI").await?;
//! let similarity = cosine_similarity(&a, &b);
//! ```

use async_trait::async_trait;

#[cfg(feature = "embeddings")]
use crate::error::EmbeddingError;
use crate::error::Result;
use crate::utils::feature_bucket;

/// Embedding dimensions for all-MiniLM-L6-v2
pub const MINILM_DIMENSIONS: usize = 384;

/// Text embedding capability.
///
/// Implementations must be deterministic for identical input within a
/// process lifetime and always return `dimensions()` components.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output dimensionality
    fn dimensions(&self) -> usize;
}

// ─────────────────────────────────────────────────────────────────────────────
// Feature hashing
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic bag-of-words embedder.
///
/// Lowercased alphanumeric tokens and adjacent token pairs are hashed into
/// `dimension` signed buckets and the result is L2-normalised. Texts that
/// share vocabulary land close together, which is enough for ranking
/// market events by topic.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous core of [`Embedder::embed`].
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        for token in &tokens {
            let (bucket, sign) = feature_bucket(token, self.dimension);
            vector[bucket] += sign;
        }

        // Bigrams carry half weight
        for pair in tokens.windows(2) {
            let feature = format!("{} {}", pair[0], pair[1]);
            let (bucket, sign) = feature_bucket(&feature, self.dimension);
            vector[bucket] += 0.5 * sign;
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(MINILM_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fastembed backend
// ─────────────────────────────────────────────────────────────────────────────

/// Local model embedder backed by `fastembed`.
#[cfg(feature = "embeddings")]
pub struct FastEmbedder {
    model: std::sync::Arc<tokio::sync::RwLock<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "embeddings")]
impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embeddings")]
impl FastEmbedder {
    pub fn new() -> Self {
        Self {
            model: std::sync::Arc::new(tokio::sync::RwLock::new(None)),
        }
    }

    /// Initialize the embedding model (lazy loading)
    async fn ensure_model(&self) -> Result<()> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let model_guard = self.model.read().await;
        if model_guard.is_some() {
            return Ok(());
        }
        drop(model_guard);

        let mut model_guard = self.model.write().await;
        if model_guard.is_some() {
            return Ok(());
        }

        tracing::info!("Loading embedding model: all-MiniLM-L6-v2");
        let start = std::time::Instant::now();

        let mut init_options = InitOptions::default();
        init_options.model_name = EmbeddingModel::AllMiniLML6V2;
        init_options.show_download_progress = false;

        let model = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::backend(format!("Failed to load embedding model: {}", e))
        })?;

        tracing::info!("Embedding model loaded in {:?}", start.elapsed());

        *model_guard = Some(model);
        Ok(())
    }

    /// Check if the model is loaded
    pub async fn is_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }
}

#[cfg(feature = "embeddings")]
#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.ensure_model().await?;

        let model_guard = self.model.read().await;
        let model = model_guard
            .as_ref()
            .ok_or_else(|| EmbeddingError::backend("Embedding model not initialized"))?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::backend(format!("Failed to generate embedding: {}", e)))?;

        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::backend("No embedding generated"))?;

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vector math
// ─────────────────────────────────────────────────────────────────────────────

/// Compute cosine similarity between two vectors
///
/// Returns a value between -1.0 and 1.0, where 1.0 means identical,
/// 0.0 means orthogonal, and -1.0 means opposite. Mismatched lengths and
/// zero vectors yield 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Normalize a similarity score to 0-1 range
///
/// Converts cosine similarity (-1 to 1) to relevance score (0 to 1)
pub fn normalize_similarity(similarity: f32) -> f64 {
    ((similarity as f64 + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
