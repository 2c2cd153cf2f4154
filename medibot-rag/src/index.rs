//! Immutable in-memory vector index with cosine similarity search.
//!
//! A [`VectorIndex`] is built once from `(Chunk, vector)` pairs and is
//! read-only afterwards, so it can be shared across concurrent queries
//! without locking. Rebuilding means constructing a new index and swapping
//! the [`IndexHandle`] that points at it.
//!
//! Ranking uses cosine similarity (higher is more relevant) at build, query,
//! persist and load time. Ties are broken by insertion order.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, RetrievalResult, ScoredChunk};
use crate::error::{MedibotError, Result};

/// Version of the on-disk index format.
const FORMAT_VERSION: u32 = 1;

/// The similarity metric an index ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity; higher scores rank first.
    Cosine,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// A read-only collection of chunks and their embeddings.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings.
    ///
    /// Building is all-or-nothing: if any entry is rejected no index is
    /// returned. An empty `entries` list produces an empty index whose
    /// queries return no results.
    ///
    /// # Errors
    ///
    /// - [`MedibotError::ConfigError`] if the first vector is empty.
    /// - [`MedibotError::DimensionMismatch`] if any vector's length differs
    ///   from the first vector's length.
    /// - [`MedibotError::NonFiniteVector`] if any component is NaN or infinite.
    pub fn build(entries: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        let Some(dimensions) = entries.first().map(|(_, v)| v.len()) else {
            return Ok(Self::default());
        };
        if dimensions == 0 {
            return Err(MedibotError::ConfigError(
                "embedding vectors must not be empty".to_string(),
            ));
        }

        let mut built = Vec::with_capacity(entries.len());
        for (chunk, vector) in entries {
            if vector.len() != dimensions {
                return Err(MedibotError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            if !is_finite(&vector) {
                return Err(MedibotError::NonFiniteVector { chunk_id: chunk.id });
            }
            let norm = l2_norm(&vector);
            built.push(IndexEntry { chunk, vector, norm });
        }

        debug!(entries = built.len(), dimensions, "built vector index");
        Ok(Self { dimensions: Some(dimensions), entries: built })
    }

    /// The metric this index ranks by.
    pub fn metric(&self) -> SimilarityMetric {
        SimilarityMetric::Cosine
    }

    /// Vector dimensionality, or `None` for an empty index.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the indexed chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Return the `k` chunks most similar to `vector`, best first.
    ///
    /// Returns `min(k, len)` hits. Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::DimensionMismatch`] if `vector` does not have
    /// the index dimensionality.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        let Some(dimensions) = self.dimensions else {
            return Ok(RetrievalResult::empty());
        };
        if vector.len() != dimensions {
            return Err(MedibotError::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let query_norm = l2_norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(vector, query_norm, &entry.vector, entry.norm)))
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect();
        Ok(RetrievalResult { hits })
    }

    /// Write the index to `path` as JSON.
    ///
    /// The file is written next to `path` first and renamed into place, so a
    /// reader never sees a partially written index.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::Io`] or [`MedibotError::Json`] on failure.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = PersistedIndexRef {
            format_version: FORMAT_VERSION,
            metric: self.metric(),
            dimensions: self.dimensions,
            entries: self
                .entries
                .iter()
                .map(|e| PersistedEntryRef { chunk: &e.chunk, vector: &e.vector })
                .collect(),
        };
        let bytes = serde_json::to_vec(&file)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        info!(path = %path.display(), entries = self.len(), "persisted vector index");
        Ok(())
    }

    /// Read an index previously written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// - [`MedibotError::Io`] / [`MedibotError::Json`] if the file cannot be read or parsed.
    /// - [`MedibotError::Persistence`] if the format version or recorded
    ///   dimensionality does not match the entries.
    /// - [`MedibotError::DimensionMismatch`] if entries disagree with each other.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file: PersistedIndex = serde_json::from_slice(&bytes)?;

        if file.format_version != FORMAT_VERSION {
            return Err(MedibotError::Persistence(format!(
                "unsupported index format version {} (expected {FORMAT_VERSION})",
                file.format_version
            )));
        }
        if file.metric != SimilarityMetric::Cosine {
            return Err(MedibotError::Persistence(format!(
                "index was built with {:?} similarity",
                file.metric
            )));
        }

        let index = Self::build(file.entries.into_iter().map(|e| (e.chunk, e.vector)).collect())?;
        if index.dimensions != file.dimensions {
            return Err(MedibotError::Persistence(format!(
                "index header declares {:?} dimensions but entries have {:?}",
                file.dimensions, index.dimensions
            )));
        }

        info!(path = %path.display(), entries = index.len(), "loaded vector index");
        Ok(index)
    }
}

/// A versioned, shareable pointer to an immutable [`VectorIndex`].
///
/// Every build or load produces a handle with a new version; cached answers
/// are tagged with the version they were computed against.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    version: u64,
    index: Arc<VectorIndex>,
}

impl IndexHandle {
    /// Wrap `index` under `version`.
    pub fn new(version: u64, index: VectorIndex) -> Self {
        Self { version, index: Arc::new(index) }
    }

    /// The version of this handle.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The shared index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    format_version: u32,
    metric: SimilarityMetric,
    dimensions: Option<usize>,
    entries: Vec<PersistedEntryRef<'a>>,
}

#[derive(Serialize)]
struct PersistedEntryRef<'a> {
    chunk: &'a Chunk,
    vector: &'a [f32],
}

#[derive(Deserialize)]
struct PersistedIndex {
    format_version: u32,
    metric: SimilarityMetric,
    dimensions: Option<usize>,
    entries: Vec<PersistedEntry>,
}

#[derive(Deserialize)]
struct PersistedEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub(crate) fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed norms. Returns 0.0 if either vector
/// has zero magnitude.
fn cosine_similarity(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
