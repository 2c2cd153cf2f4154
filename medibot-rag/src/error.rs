//! Error types for the `medibot-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur anywhere in the ingest or query pipeline.
///
/// An empty retrieval result is never represented here: "no relevant
/// context" is a valid outcome, while every variant below aborts the query.
#[derive(Debug, Error)]
pub enum MedibotError {
    /// Invalid chunking, index or pipeline parameters.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A vector's length disagrees with the index dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the index was built with.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// A vector holds a NaN or infinite component and cannot be ranked or persisted.
    #[error("Non-finite vector for chunk '{chunk_id}'")]
    NonFiniteVector {
        /// The chunk whose embedding was rejected.
        chunk_id: String,
    },

    /// An embedding backend failed or rejected its input.
    #[error("Embedder error ({provider}): {message}")]
    EmbedderError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The question could not be embedded, so retrieval cannot proceed.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// An external call did not complete within its deadline.
    #[error("Upstream timeout: {stage} did not respond within {timeout:?}")]
    UpstreamTimeout {
        /// The pipeline stage that timed out (`embedder` or `generator`).
        stage: &'static str,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// A text-generation backend failed.
    #[error("Generator error ({provider}): {message}")]
    GeneratorError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// No index has been built or loaded yet.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The persisted index could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An I/O error while persisting or loading the index.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A (de)serialization error while persisting or loading the index.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A convenience result type for medibot operations.
pub type Result<T> = std::result::Result<T, MedibotError>;
