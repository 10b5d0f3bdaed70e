//! Error types for finmem-core.

use thiserror::Error;

/// Result type alias using finmem-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for memory operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or empty ingest input. Aborts only the failing ingest.
    #[error("invalid event: {message}")]
    InvalidEvent { message: String },

    /// The embedder failed, timed out or returned the wrong shape.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Retrieve was called while both stores were empty.
    #[error("memory is empty: nothing has been ingested yet")]
    EmptyMemory,

    /// A store was configured with a capacity that can never hold an entry.
    #[error("{store} capacity must be greater than 0 (got {capacity})")]
    CapacityConfiguration { store: &'static str, capacity: usize },

    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("invalid snapshot: {message}")]
    InvalidSnapshot { message: String },
}

/// Failures of the embedding capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding backend failed: {message}")]
    Backend { message: String },

    #[error("expected {expected} dimensions, embedder returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedder did not respond within {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl Error {
    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Check if this error is the cold-start empty memory signal
    pub fn is_empty_memory(&self) -> bool {
        matches!(self, Self::EmptyMemory)
    }

    /// Check if the caller can carry on after this error.
    ///
    /// Configuration errors are fatal at startup; everything else aborts
    /// a single call and leaves the stores untouched.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::CapacityConfiguration { .. } | Self::InvalidConfig { .. }
        )
    }
}

impl EmbeddingError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
