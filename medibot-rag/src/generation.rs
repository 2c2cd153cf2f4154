//! Text-generation capability and the offline extractive generator.

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt::Prompt;

/// Sentence returned when the context cannot answer the question.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't have enough information in the provided documents to answer that question.";

/// A language model that turns an assembled [`Prompt`] into answer text.
///
/// Implementations report failures as
/// [`MedibotError::GeneratorError`](crate::MedibotError::GeneratorError).
/// No retry is performed by the pipeline.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer for `prompt`.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// A short provider name used in logs.
    fn name(&self) -> &str;
}

/// A generator that needs no model: it quotes the most relevant passage.
///
/// Useful offline and in tests. With no context it answers
/// [`INSUFFICIENT_CONTEXT_ANSWER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        Ok(match prompt.passages().first() {
            Some(best) => format!("According to the documents: {}", best.chunk.text.trim()),
            None => INSUFFICIENT_CONTEXT_ANSWER.to_string(),
        })
    }

    fn name(&self) -> &str {
        "extractive"
    }
}
