//! Medibot pipeline orchestrator.
//!
//! [`Medibot`] coordinates the offline build (chunk → embed → index) and the
//! query path (embed → retrieve → prompt → generate → answer) by composing an
//! [`Embedder`], a [`Generator`] and a [`Chunker`].
//!
//! The current index lives behind a versioned [`IndexHandle`]. Queries clone
//! the handle when they start and never see a later swap; rebuilds and loads
//! construct the new index completely before swapping it in and clearing the
//! answer cache.
//!
//! # Example
//!
//! ```rust,ignore
//! use medibot_rag::{Medibot, MedibotConfig, HashEmbedder, ExtractiveGenerator};
//!
//! let bot = Medibot::builder()
//!     .config(MedibotConfig::default())
//!     .embedder(Arc::new(HashEmbedder::default()))
//!     .generator(Arc::new(ExtractiveGenerator))
//!     .build()?;
//!
//! bot.rebuild(&documents).await?;
//! let answer = bot.ask("What reduces fever?", 3).await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::answer::AnswerAssembler;
use crate::cache::{AnswerCache, CachePolicy};
use crate::chunking::{Chunker, TextChunker};
use crate::config::MedibotConfig;
use crate::document::{Answer, Chunk, Document, RetrievalResult};
use crate::embedding::Embedder;
use crate::error::{MedibotError, Result};
use crate::generation::Generator;
use crate::index::{IndexHandle, VectorIndex};
use crate::prompt::PromptAssembler;
use crate::retriever::{Retriever, with_deadline};

/// Counts reported after an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents that were chunked.
    pub documents: usize,
    /// Chunks stored in the index.
    pub chunks: usize,
    /// Version of the handle now serving queries.
    pub version: u64,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`Medibot::builder()`]. All methods take `&self`, so a
/// single `Arc<Medibot>` can serve concurrent queries while another task
/// rebuilds the index.
pub struct Medibot {
    config: MedibotConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    chunker: Arc<dyn Chunker>,
    prompts: PromptAssembler,
    answers: AnswerAssembler,
    index: RwLock<Option<Arc<IndexHandle>>>,
    next_version: AtomicU64,
    cache: AnswerCache,
}

impl Medibot {
    /// Create a new [`MedibotBuilder`].
    pub fn builder() -> MedibotBuilder {
        MedibotBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &MedibotConfig {
        &self.config
    }

    /// Return a reference to the embedder.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Return a reference to the answer cache.
    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    /// Chunk and embed `documents` into a new index without installing it.
    ///
    /// # Errors
    ///
    /// - [`MedibotError::EmbeddingUnavailable`] if embedding fails, naming the document.
    /// - [`MedibotError::UpstreamTimeout`] if the embedder does not answer in time.
    /// - [`MedibotError::DimensionMismatch`] if the embedder is not dimension-stable.
    pub async fn build_index(&self, documents: &[Document]) -> Result<VectorIndex> {
        let mut entries: Vec<(Chunk, Vec<f32>)> = Vec::new();

        for document in documents {
            let chunks = self.chunker.chunk(document);
            if chunks.is_empty() {
                debug!(document.id = %document.id, "skipping empty document");
                continue;
            }

            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let vectors = with_deadline(
                "embedder",
                self.config.upstream_timeout,
                self.embedder.embed_batch(&texts),
            )
            .await
            .map_err(|e| match e {
                timeout @ MedibotError::UpstreamTimeout { .. } => timeout,
                other => {
                    error!(
                        document.id = %document.id,
                        error = %other,
                        "embedding failed during build"
                    );
                    MedibotError::EmbeddingUnavailable(format!(
                        "embedding failed for document '{}': {other}",
                        document.id
                    ))
                }
            })?;

            if vectors.len() != chunks.len() {
                error!(
                    document.id = %document.id,
                    chunks = chunks.len(),
                    vectors = vectors.len(),
                    "embedder returned wrong number of vectors"
                );
                return Err(MedibotError::EmbeddingUnavailable(format!(
                    "embedder returned {} vectors for {} chunks of document '{}'",
                    vectors.len(),
                    chunks.len(),
                    document.id
                )));
            }

            debug!(document.id = %document.id, chunk_count = chunks.len(), "embedded document");
            entries.extend(chunks.into_iter().zip(vectors));
        }

        VectorIndex::build(entries)
    }

    /// Build an index from `documents` and swap it in.
    ///
    /// On failure the previously installed index keeps serving queries.
    ///
    /// # Errors
    ///
    /// See [`build_index`](Self::build_index).
    pub async fn rebuild(&self, documents: &[Document]) -> Result<IndexStats> {
        let index = self.build_index(documents).await?;
        let chunks = index.len();
        let version = self.install(index).await;
        info!(documents = documents.len(), chunks, version, "rebuilt index");
        Ok(IndexStats { documents: documents.len(), chunks, version })
    }

    /// Swap `index` in as the current index and invalidate the answer cache.
    ///
    /// Returns the new handle version. Queries already running keep the
    /// handle they started with.
    pub async fn install(&self, index: VectorIndex) -> u64 {
        let mut current = self.index.write().await;
        // assigned under the write lock so the installed version only grows
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        *current = Some(Arc::new(IndexHandle::new(version, index)));
        self.cache.clear();
        drop(current);
        debug!(version, "installed index");
        version
    }

    /// Load a persisted index and swap it in.
    ///
    /// # Errors
    ///
    /// Returns the error from [`VectorIndex::load`]; the current index is
    /// left untouched.
    pub async fn load_index(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let index = VectorIndex::load(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load index");
            e
        })?;
        if let (Some(expected), actual) = (index.dimensions(), self.embedder.dimensions()) {
            if expected != actual {
                return Err(MedibotError::DimensionMismatch { expected, actual });
            }
        }
        Ok(self.install(index).await)
    }

    /// Persist the current index to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::IndexUnavailable`] if no index is installed,
    /// or the error from [`VectorIndex::persist`].
    pub async fn persist_index(&self, path: impl AsRef<Path>) -> Result<()> {
        self.current_index().await?.index().persist(path).await
    }

    /// The handle serving queries right now.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::IndexUnavailable`] before the first build or load.
    pub async fn current_index(&self) -> Result<Arc<IndexHandle>> {
        self.index.read().await.clone().ok_or_else(|| {
            MedibotError::IndexUnavailable("no index has been built or loaded".to_string())
        })
    }

    /// Retrieve the `k` chunks most relevant to `question`.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve`]; also [`MedibotError::IndexUnavailable`].
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        let handle = self.current_index().await?;
        self.retriever(&handle).retrieve(question, k).await
    }

    /// Answer `question` from the top `k` chunks, serving repeated questions
    /// from the cache.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the query; see [`ask_with`](Self::ask_with).
    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer> {
        self.ask_with(question, k, CachePolicy::Use).await
    }

    /// Answer `question` without reading the cache.
    ///
    /// # Errors
    ///
    /// See [`ask_with`](Self::ask_with).
    pub async fn ask_uncached(&self, question: &str, k: usize) -> Result<Answer> {
        self.ask_with(question, k, CachePolicy::Bypass).await
    }

    /// Run the full query pipeline: embed → retrieve → prompt → generate → answer.
    ///
    /// An empty retrieval result still reaches the generator, which is told
    /// that no context was found.
    ///
    /// # Errors
    ///
    /// - [`MedibotError::IndexUnavailable`] if no index is installed.
    /// - [`MedibotError::EmbeddingUnavailable`] if the question cannot be embedded.
    /// - [`MedibotError::UpstreamTimeout`] if the embedder or generator is too slow.
    /// - [`MedibotError::GeneratorError`] if generation fails.
    pub async fn ask_with(&self, question: &str, k: usize, policy: CachePolicy) -> Result<Answer> {
        let handle = self.current_index().await?;
        let version = handle.version();

        if policy == CachePolicy::Use {
            if let Some(answer) = self.cache.get(question, k, version) {
                debug!(version, k, "answer served from cache");
                return Ok(answer);
            }
        }

        let result = self.retriever(&handle).retrieve(question, k).await?;
        let prompt = self.prompts.assemble(question, &result);
        debug!(
            hits = result.len(),
            included = prompt.passages().len(),
            has_context = prompt.has_context(),
            "assembled prompt"
        );

        let generated = with_deadline(
            "generator",
            self.config.upstream_timeout,
            self.generator.generate(&prompt),
        )
        .await
        .map_err(|e| match e {
            e @ (MedibotError::UpstreamTimeout { .. } | MedibotError::GeneratorError { .. }) => e,
            other => MedibotError::GeneratorError {
                provider: self.generator.name().to_string(),
                message: other.to_string(),
            },
        })
        .inspect_err(|e| {
            error!(generator = self.generator.name(), error = %e, "generation failed");
        })?;

        let answer = self.answers.assemble(&generated, &prompt.included());
        info!(version, k, sources = answer.sources.len(), "query completed");

        self.cache.insert(question, k, version, answer.clone());
        Ok(answer)
    }

    fn retriever(&self, handle: &IndexHandle) -> Retriever {
        Retriever::new(
            Arc::clone(handle.index()),
            Arc::clone(&self.embedder),
            self.config.upstream_timeout,
        )
        .with_min_score(self.config.min_score)
    }
}

/// Builder for constructing a [`Medibot`].
///
/// `config` defaults to [`MedibotConfig::default`] and the chunker to a
/// [`TextChunker`] built from the config. The embedder and generator are
/// required.
///
/// # Example
///
/// ```rust,ignore
/// let bot = Medibot::builder()
///     .config(config)
///     .embedder(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .chunker(Arc::new(chunker))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct MedibotBuilder {
    config: Option<MedibotConfig>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn Generator>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl MedibotBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: MedibotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`Medibot`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::ConfigError`] if the config is invalid or a
    /// required field is missing.
    pub fn build(self) -> Result<Medibot> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedder = self
            .embedder
            .ok_or_else(|| MedibotError::ConfigError("embedder is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| MedibotError::ConfigError("generator is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(
                TextChunker::new(config.chunk_size, config.chunk_overlap)?
                    .with_tolerance(config.boundary_tolerance),
            ),
        };

        Ok(Medibot {
            prompts: PromptAssembler::new(config.max_context_chars),
            answers: AnswerAssembler,
            cache: AnswerCache::new(config.cache_capacity),
            index: RwLock::new(None),
            next_version: AtomicU64::new(0),
            config,
            embedder,
            generator,
            chunker,
        })
    }
}
