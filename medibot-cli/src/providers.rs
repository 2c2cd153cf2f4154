//! Embedder and generator selection from command-line options.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use medibot_rag::{Embedder, ExtractiveGenerator, Generator, HashEmbedder};

/// Which embedding backend to use. Must match the one the index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Offline hashing embedder.
    Hash,
    /// OpenAI-compatible embeddings API (`OPENAI_API_KEY`).
    Openai,
}

#[derive(Debug, Clone, Args)]
pub struct EmbedderArgs {
    /// Embedding backend
    #[arg(long, value_enum, default_value = "hash", env = "MEDIBOT_EMBEDDER")]
    pub embedder: EmbedderKind,

    /// Embedding dimensionality
    #[arg(long, default_value = "384")]
    pub dimensions: usize,

    /// Embedding model name (openai backend)
    #[arg(long, env = "MEDIBOT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Base URL of an OpenAI-compatible embeddings server
    #[arg(long, env = "MEDIBOT_EMBEDDING_URL")]
    pub embedding_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct GeneratorArgs {
    /// Sampling temperature
    #[arg(long, default_value = "0.5")]
    pub temperature: f32,

    /// Maximum tokens in the generated answer
    #[arg(long, default_value = "512", value_parser = clap::value_parser!(u32).range(128..=4096))]
    pub max_tokens: u32,

    /// Groq model name
    #[arg(long, default_value = "llama-3.1-8b-instant", env = "MEDIBOT_MODEL")]
    pub model: String,

    /// Answer by quoting the best passage instead of calling a model
    #[arg(long)]
    pub offline: bool,
}

pub fn embedder(args: &EmbedderArgs) -> Result<Arc<dyn Embedder>> {
    match args.embedder {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::new(args.dimensions)?)),
        EmbedderKind::Openai => openai_embedder(args),
    }
}

#[cfg(feature = "openai")]
fn openai_embedder(args: &EmbedderArgs) -> Result<Arc<dyn Embedder>> {
    let mut embedder =
        medibot_rag::openai::OpenAiEmbedder::from_env()?.with_dimensions(args.dimensions);
    if let Some(model) = &args.embedding_model {
        embedder = embedder.with_model(model);
    }
    if let Some(url) = &args.embedding_url {
        embedder = embedder.with_base_url(url);
    }
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "openai"))]
fn openai_embedder(_args: &EmbedderArgs) -> Result<Arc<dyn Embedder>> {
    anyhow::bail!("this build of medibot was compiled without the `openai` feature")
}

pub fn generator(args: &GeneratorArgs) -> Result<Arc<dyn Generator>> {
    if args.offline {
        return Ok(Arc::new(ExtractiveGenerator));
    }
    groq_generator(args)
}

#[cfg(feature = "groq")]
fn groq_generator(args: &GeneratorArgs) -> Result<Arc<dyn Generator>> {
    if std::env::var("GROQ_API_KEY").map_or(true, |key| key.is_empty()) {
        tracing::warn!("GROQ_API_KEY not set; answering offline by quoting the best passage");
        return Ok(Arc::new(ExtractiveGenerator));
    }
    let generator = medibot_rag::groq::GroqGenerator::from_env()?
        .with_model(&args.model)
        .with_temperature(args.temperature)
        .with_max_tokens(args.max_tokens);
    Ok(Arc::new(generator))
}

#[cfg(not(feature = "groq"))]
fn groq_generator(_args: &GeneratorArgs) -> Result<Arc<dyn Generator>> {
    tracing::warn!("compiled without the `groq` feature; answering offline");
    Ok(Arc::new(ExtractiveGenerator))
}
