//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`TextChunker`], which cuts
//! text into overlapping, character-counted windows and snaps each cut to the
//! nearest natural break (paragraph, then sentence, then word) inside a small
//! tolerance window before falling back to a hard cut.

use crate::config::validate_chunking;
use crate::document::{Chunk, Document};
use crate::error::Result;

/// Default fraction of the chunk size searched backwards for a natural break.
pub const DEFAULT_BOUNDARY_TOLERANCE: f32 = 0.2;

/// A strategy for splitting documents into chunks.
///
/// Implementations must be deterministic: identical input always yields
/// identical chunk boundaries.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split `document` into chunks of at most `chunk_size` characters, each
/// overlapping the previous one by up to `overlap` characters.
///
/// # Errors
///
/// Returns [`MedibotError::ConfigError`](crate::MedibotError::ConfigError) if
/// `chunk_size == 0` or `overlap >= chunk_size`.
pub fn chunk(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(TextChunker::new(chunk_size, overlap)?.chunk(document))
}

/// Splits text into overlapping chunks, preferring natural text breaks.
///
/// Chunk IDs are `{document_id}#{start}`, where `start` is the chunk's
/// character offset. Each chunk inherits the parent document's metadata plus
/// a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use medibot_rag::{Chunker, TextChunker};
///
/// let chunker = TextChunker::new(512, 100)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    tolerance: f32,
}

impl TextChunker {
    /// Create a new `TextChunker` with the default boundary tolerance.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::ConfigError`](crate::MedibotError::ConfigError)
    /// if `chunk_size == 0` or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, tolerance: DEFAULT_BOUNDARY_TOLERANCE })
    }

    /// Set the fraction of `chunk_size` searched for a natural break.
    ///
    /// `0.0` disables boundary snapping and always cuts at `chunk_size`.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance.clamp(0.0, 0.99);
        self
    }

    fn window(&self) -> usize {
        (self.chunk_size as f32 * self.tolerance) as usize
    }
}

impl Chunker for TextChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = document.text.chars().collect();
        let len = chars.len();
        // byte_at[i] is the byte offset of character i; byte_at[len] == text.len()
        let mut byte_at: Vec<usize> = document.text.char_indices().map(|(b, _)| b).collect();
        byte_at.push(document.text.len());

        let window = self.window();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                find_break(&chars, start, hard_end, window)
            };

            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), chunks.len().to_string());

            chunks.push(Chunk {
                id: Chunk::make_id(&document.id, start),
                text: document.text[byte_at[start]..byte_at[end]].to_string(),
                start,
                end,
                document_id: document.id.clone(),
                metadata,
            });

            if end == len {
                break;
            }
            // Always advance, even when a snapped break eats into the overlap.
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}

/// Pick the end offset for a chunk starting at `start` whose hard limit is
/// `hard_end`. Returns a value in `(start, hard_end]`.
fn find_break(chars: &[char], start: usize, hard_end: usize, window: usize) -> usize {
    let lo = hard_end.saturating_sub(window).max(start + 1);

    let paragraph = |e: usize| e >= 2 && chars[e - 2] == '\n' && chars[e - 1] == '\n';
    let sentence = |e: usize| {
        chars[e - 1] == '\n'
            || (e >= 2 && matches!(chars[e - 2], '.' | '!' | '?') && chars[e - 1].is_whitespace())
    };
    let word = |e: usize| {
        chars[e - 1].is_whitespace() || chars.get(e).is_some_and(|c| c.is_whitespace())
    };

    let candidates: [&dyn Fn(usize) -> bool; 3] = [&paragraph, &sentence, &word];
    for is_break in candidates {
        if let Some(end) = (lo..=hard_end).rev().find(|&e| is_break(e)) {
            return end;
        }
    }
    hard_end
}
