//! Data types for documents, chunks, retrieval results and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
///
/// Documents are immutable once ingested; every [`Chunk`] refers back to its
/// document by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document (usually a path or URI).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata such as `page`, `section` or `source`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A segment of a [`Document`].
///
/// `start` and `end` are character offsets (half-open) into the parent
/// document's text. Consecutive chunks may overlap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier: `{document_id}#{start}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Character offset of the first character in the parent document.
    pub start: usize,
    /// Character offset one past the last character in the parent document.
    pub end: usize,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Build the deterministic chunk id for a document offset.
    pub fn make_id(document_id: &str, start: usize) -> String {
        format!("{document_id}#{start}")
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Ranked chunks for one query, ordered by descending score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The ranked hits, most relevant first.
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// An empty result: no relevant context exists.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hits were found.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate over the hits in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.hits.iter()
    }
}

impl From<Vec<ScoredChunk>> for RetrievalResult {
    fn from(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }
}

/// A reference to the source material an answer was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReference {
    /// The document the passage came from.
    pub document_id: String,
    /// The first chunk of that document seen in the ranking.
    pub chunk_id: String,
    /// Page number, when the loader recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Human-readable label, e.g. `guidelines.pdf — page 4`.
    pub label: String,
    /// A short preview of the chunk text.
    pub preview: String,
}

/// The terminal output of a query: generated text plus its sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// Source references deduplicated by document, in first-seen rank order.
    pub sources: Vec<SourceReference>,
}
