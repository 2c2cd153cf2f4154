//! # medibot-rag
//!
//! Retrieval-Augmented Generation core for answering medical questions from a
//! curated document collection, with every answer traceable to its sources.
//!
//! ```text
//! Document -> Chunker -> Embedder -> VectorIndex          (offline build)
//!                                        |
//! Question -> Embedder -> Retriever <----+
//!                            |
//!                     PromptAssembler -> Generator -> AnswerAssembler -> Answer
//! ```
//!
//! The embedder and generator are capability traits; concrete backends are
//! chosen when the [`Medibot`] pipeline is built:
//!
//! - [`HashEmbedder`] / [`ExtractiveGenerator`]: offline, deterministic
//! - `openai::OpenAiEmbedder`: feature `openai`
//! - `groq::GroqGenerator`: feature `groq`
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medibot_rag::{Document, ExtractiveGenerator, HashEmbedder, Medibot};
//!
//! let bot = Medibot::builder()
//!     .embedder(Arc::new(HashEmbedder::default()))
//!     .generator(Arc::new(ExtractiveGenerator))
//!     .build()?;
//!
//! bot.rebuild(&[Document::new("aspirin", "Aspirin reduces fever.")]).await?;
//! let answer = bot.ask("What reduces fever?", 3).await?;
//! for source in &answer.sources {
//!     println!("{}", source.label);
//! }
//! ```

pub mod answer;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

#[cfg(feature = "groq")]
pub mod groq;
#[cfg(feature = "openai")]
pub mod openai;

pub use answer::{AnswerAssembler, NO_ANSWER_TEXT};
pub use cache::{AnswerCache, CachePolicy};
pub use chunking::{Chunker, TextChunker, chunk};
pub use config::{MedibotConfig, MedibotConfigBuilder};
pub use document::{Answer, Chunk, Document, RetrievalResult, ScoredChunk, SourceReference};
pub use embedding::{Embedder, HashEmbedder};
pub use error::{MedibotError, Result};
pub use generation::{ExtractiveGenerator, Generator, INSUFFICIENT_CONTEXT_ANSWER};
pub use index::{IndexHandle, SimilarityMetric, VectorIndex};
pub use pipeline::{IndexStats, Medibot, MedibotBuilder};
pub use prompt::{ANSWER_INSTRUCTION, NO_CONTEXT_MARKER, Prompt, PromptAssembler};
pub use retriever::Retriever;
