//! Answer packaging with source attribution.

use std::collections::{HashMap, HashSet};

use crate::document::{Answer, Chunk, RetrievalResult, SourceReference};

/// Shown when the generator returned only whitespace.
pub const NO_ANSWER_TEXT: &str = "(No answer text returned)";

/// Maximum number of characters kept in a source preview.
pub const PREVIEW_CHARS: usize = 400;

/// Metadata keys that may carry a page number, in lookup order.
const PAGE_KEYS: [&str; 4] = ["page", "page_number", "loc.page", "pdf_page"];

/// Metadata keys that may carry a source path or name, in lookup order.
const SOURCE_KEYS: [&str; 5] = ["source", "file_path", "path", "document_id", "id"];

/// Packages generated text with deduplicated source references.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerAssembler;

impl AnswerAssembler {
    /// Create an answer from `generated_text` and the chunks it was
    /// conditioned on.
    ///
    /// Sources are deduplicated by document id, keeping the first chunk seen
    /// in ranking order.
    pub fn assemble(&self, generated_text: &str, result: &RetrievalResult) -> Answer {
        let text = generated_text.trim();
        let text = if text.is_empty() { NO_ANSWER_TEXT.to_string() } else { text.to_string() };

        let mut seen = HashSet::new();
        let sources = result
            .iter()
            .filter(|hit| seen.insert(hit.chunk.document_id.as_str()))
            .map(|hit| source_reference(&hit.chunk))
            .collect();

        Answer { text, sources }
    }
}

fn source_reference(chunk: &Chunk) -> SourceReference {
    let page = first_present(&chunk.metadata, &PAGE_KEYS);
    let source =
        first_present(&chunk.metadata, &SOURCE_KEYS).unwrap_or_else(|| chunk.document_id.clone());
    let label = match &page {
        Some(page) => format!("{source} — page {page}"),
        None => source,
    };
    let preview: String = chunk.text.chars().take(PREVIEW_CHARS).collect();

    SourceReference {
        document_id: chunk.document_id.clone(),
        chunk_id: chunk.id.clone(),
        page,
        label,
        preview: preview.trim().to_string(),
    }
}

fn first_present(metadata: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
