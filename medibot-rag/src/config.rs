//! Configuration for the medibot pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MedibotError, Result};

/// Configuration parameters for chunking, retrieval, prompting and caching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedibotConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Fraction of `chunk_size` searched backwards for a natural break.
    pub boundary_tolerance: f32,
    /// Number of top results to retrieve when the caller does not say.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps every hit.
    pub min_score: Option<f32>,
    /// Maximum number of context characters placed in a prompt.
    pub max_context_chars: usize,
    /// Deadline for every embedder and generator call.
    pub upstream_timeout: Duration,
    /// Number of answers kept in the query cache. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for MedibotConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            boundary_tolerance: 0.2,
            top_k: 3,
            min_score: None,
            max_context_chars: 6000,
            upstream_timeout: Duration::from_secs(30),
            cache_capacity: 128,
        }
    }
}

impl MedibotConfig {
    /// Create a new builder for constructing a [`MedibotConfig`].
    pub fn builder() -> MedibotConfigBuilder {
        MedibotConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `boundary_tolerance` is outside `[0, 1)`
    /// - `max_context_chars == 0`
    /// - `upstream_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if !(0.0..1.0).contains(&self.boundary_tolerance) {
            return Err(MedibotError::ConfigError(format!(
                "boundary_tolerance ({}) must be in [0, 1)",
                self.boundary_tolerance
            )));
        }
        if self.max_context_chars == 0 {
            return Err(MedibotError::ConfigError(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        if self.upstream_timeout.is_zero() {
            return Err(MedibotError::ConfigError(
                "upstream_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a chunk size / overlap pair.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(MedibotError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(MedibotError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`MedibotConfig`].
#[derive(Debug, Clone, Default)]
pub struct MedibotConfigBuilder {
    config: MedibotConfig,
}

impl MedibotConfigBuilder {
    /// Set the target chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the fraction of the chunk size searched for a natural break.
    pub fn boundary_tolerance(mut self, tolerance: f32) -> Self {
        self.config.boundary_tolerance = tolerance;
        self
    }

    /// Set the default number of results to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Drop hits scoring below `threshold`.
    pub fn min_score(mut self, threshold: f32) -> Self {
        self.config.min_score = Some(threshold);
        self
    }

    /// Set the prompt context budget in characters.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the deadline for embedder and generator calls.
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.config.upstream_timeout = timeout;
        self
    }

    /// Set the answer cache capacity. Zero disables caching.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Build the [`MedibotConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`MedibotConfig::validate`].
    pub fn build(self) -> Result<MedibotConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
