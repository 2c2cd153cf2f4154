//! Prompt assembly.
//!
//! Every prompt carries [`ANSWER_INSTRUCTION`] verbatim. Context passages are
//! added in rank order under a character budget; a passage that does not fit
//! is dropped whole together with everything ranked below it.

use crate::document::{RetrievalResult, ScoredChunk};

/// The grounding policy sent with every prompt.
pub const ANSWER_INSTRUCTION: &str = "Answer the question using only the information in the \
context below. If the context does not contain enough information to answer, say that you do \
not have enough information. Do not use outside knowledge.";

/// Placed in the context section when retrieval found nothing usable.
pub const NO_CONTEXT_MARKER: &str = "[NO CONTEXT FOUND]";

const SYSTEM_PREAMBLE: &str = "You are Medibot, an assistant that answers medical questions \
from a curated document collection.";

const PASSAGE_SEPARATOR: &str = "\n\n";

/// A prompt ready for a [`Generator`](crate::Generator).
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    system: String,
    context: String,
    question: String,
    passages: Vec<ScoredChunk>,
}

impl Prompt {
    /// Instructions for chat-style generators (the system turn).
    pub fn system(&self) -> &str {
        &self.system
    }

    /// The context section: tagged passages or [`NO_CONTEXT_MARKER`].
    pub fn context(&self) -> &str {
        &self.context
    }

    /// The question being answered.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// The ranked passages that fit in the context budget.
    pub fn passages(&self) -> &[ScoredChunk] {
        &self.passages
    }

    /// Whether any context passage made it into the prompt.
    pub fn has_context(&self) -> bool {
        !self.passages.is_empty()
    }

    /// The passages that were included, as a retrieval result.
    pub fn included(&self) -> RetrievalResult {
        RetrievalResult::from(self.passages.clone())
    }

    /// The user turn for chat-style generators.
    pub fn user(&self) -> String {
        format!("Context:\n{}\n\nQuestion: {}", self.context, self.question)
    }

    /// The whole prompt as a single string.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user())
    }
}

/// Merges a question and its retrieved passages into a [`Prompt`].
#[derive(Debug, Clone, Copy)]
pub struct PromptAssembler {
    max_context_chars: usize,
}

impl PromptAssembler {
    /// Create an assembler with a context budget of `max_context_chars`.
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Build the prompt for `question` from `result`.
    ///
    /// Identical inputs always produce identical prompts.
    pub fn assemble(&self, question: &str, result: &RetrievalResult) -> Prompt {
        let mut blocks: Vec<String> = Vec::new();
        let mut passages = Vec::new();
        let mut used = 0;

        for hit in result.iter() {
            let block = format!(
                "[{}] (source: {}, chunk: {})\n{}",
                blocks.len() + 1,
                hit.chunk.document_id,
                hit.chunk.id,
                hit.chunk.text
            );
            let separator = if blocks.is_empty() { 0 } else { PASSAGE_SEPARATOR.len() };
            let cost = separator + block.chars().count();
            if used + cost > self.max_context_chars {
                break;
            }
            used += cost;
            blocks.push(block);
            passages.push(hit.clone());
        }

        let context = if blocks.is_empty() {
            NO_CONTEXT_MARKER.to_string()
        } else {
            blocks.join(PASSAGE_SEPARATOR)
        };

        Prompt {
            system: format!("{SYSTEM_PREAMBLE}\n{ANSWER_INSTRUCTION}"),
            context,
            question: question.trim().to_string(),
            passages,
        }
    }
}
