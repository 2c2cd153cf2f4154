//! medibot: build a document index and ask grounded medical questions.
//!
//! ```bash
//! # Build the index from a folder of .txt / .md files
//! medibot index data/ --out vectorstore/medibot_index.json
//!
//! # One-shot question
//! medibot ask "What reduces fever?" -k 3
//!
//! # Interactive chat
//! medibot chat --temperature 0.2
//! ```

mod chat;
mod corpus;
mod providers;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use medibot_rag::{ExtractiveGenerator, Medibot, MedibotConfig};
use providers::{EmbedderArgs, GeneratorArgs};
use tracing::info;

const DEFAULT_INDEX_PATH: &str = "vectorstore/medibot_index.json";

#[derive(Parser)]
#[command(name = "medibot")]
#[command(about = "Answer medical questions from your own documents, with sources")]
#[command(version)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and index a corpus of .txt / .md files
    Index {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Where to write the index
        #[arg(long, default_value = DEFAULT_INDEX_PATH, env = "MEDIBOT_INDEX")]
        out: PathBuf,

        /// Target chunk size in characters
        #[arg(long, default_value = "512")]
        chunk_size: usize,

        /// Overlap between consecutive chunks in characters
        #[arg(long, default_value = "100")]
        overlap: usize,

        #[command(flatten)]
        embedder: EmbedderArgs,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Interactive question loop
    Chat {
        #[command(flatten)]
        query: QueryArgs,

        /// Show source previews under each answer
        #[arg(long)]
        show_previews: bool,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Index file written by `medibot index`
    #[arg(long, default_value = DEFAULT_INDEX_PATH, env = "MEDIBOT_INDEX")]
    index: PathBuf,

    /// Number of passages to retrieve
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=10))]
    k: u8,

    /// Prompt context budget in characters
    #[arg(long, default_value = "6000")]
    max_context_chars: usize,

    /// Seconds to wait for the embedder or generator
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    generator: GeneratorArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_logging(&cli.log_level);

    match cli.command {
        Commands::Index { paths, out, chunk_size, overlap, embedder } => {
            build_index(&paths, &out, chunk_size, overlap, &embedder).await
        }
        Commands::Ask { question, query } => {
            let bot = open(&query).await?;
            let answer = bot.ask(&question, usize::from(query.k)).await?;
            println!("{}", chat::render_answer(&answer, true));
            Ok(())
        }
        Commands::Chat { query, show_previews } => {
            let bot = open(&query).await?;
            chat::run(&bot, usize::from(query.k), show_previews).await
        }
    }
}

async fn build_index(
    paths: &[PathBuf],
    out: &PathBuf,
    chunk_size: usize,
    overlap: usize,
    embedder: &EmbedderArgs,
) -> Result<()> {
    let config = MedibotConfig::builder().chunk_size(chunk_size).chunk_overlap(overlap).build()?;
    let bot = Medibot::builder()
        .config(config)
        .embedder(providers::embedder(embedder)?)
        .generator(Arc::new(ExtractiveGenerator))
        .build()?;

    let documents = corpus::load(paths)?;
    if documents.is_empty() {
        anyhow::bail!(
            "no .txt or .md documents found under {paths:?}; leaving {} untouched",
            out.display()
        );
    }
    let stats = bot.rebuild(&documents).await?;
    bot.persist_index(out).await.with_context(|| format!("failed to write {}", out.display()))?;

    info!(documents = stats.documents, chunks = stats.chunks, "index built");
    println!(
        "Indexed {} document(s) into {} chunk(s) at {}",
        stats.documents,
        stats.chunks,
        out.display()
    );
    Ok(())
}

async fn open(query: &QueryArgs) -> Result<Medibot> {
    if !query.index.exists() {
        anyhow::bail!(
            "Couldn't find an index at `{}`. Build one with `medibot index <paths>`.",
            query.index.display()
        );
    }

    let config = MedibotConfig::builder()
        .top_k(usize::from(query.k))
        .max_context_chars(query.max_context_chars)
        .upstream_timeout(Duration::from_secs(query.timeout_secs))
        .build()?;
    let bot = Medibot::builder()
        .config(config)
        .embedder(providers::embedder(&query.embedder)?)
        .generator(providers::generator(&query.generator)?)
        .build()?;

    bot.load_index(&query.index)
        .await
        .with_context(|| format!("failed to load index {}", query.index.display()))?;
    Ok(bot)
}
