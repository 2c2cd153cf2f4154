//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medibot_rag::{
    Embedder, ExtractiveGenerator, Generator, HashEmbedder, Medibot, MedibotConfig, MedibotError,
    Prompt, Result,
};

pub const DIM: usize = 512;

/// Wraps [`HashEmbedder`] and fails every call once `fail` is set.
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    pub fail: AtomicBool,
}

impl FlakyEmbedder {
    pub fn new() -> Self {
        Self { inner: HashEmbedder::new(DIM).unwrap(), fail: AtomicBool::new(false) }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MedibotError::EmbedderError {
                provider: "flaky".into(),
                message: "connection refused".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Wraps [`HashEmbedder`] and stops answering once `stall` is set.
pub struct StalledEmbedder {
    inner: HashEmbedder,
    pub stall: AtomicBool,
}

impl StalledEmbedder {
    pub fn new() -> Self {
        Self { inner: HashEmbedder::new(DIM).unwrap(), stall: AtomicBool::new(false) }
    }
}

#[async_trait]
impl Embedder for StalledEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Always returns a vector of the given length.
pub struct FixedEmbedder(pub Vec<f32>);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }

    fn dimensions(&self) -> usize {
        self.0.len()
    }
}

/// Delegates to [`ExtractiveGenerator`] and remembers every prompt it saw.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<Prompt>>,
    pub calls: AtomicUsize,
}

impl RecordingGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        ExtractiveGenerator.generate(prompt).await
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledGenerator;

#[async_trait]
impl Generator for StalledGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Always fails.
pub struct BrokenGenerator;

#[async_trait]
impl Generator for BrokenGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(MedibotError::GeneratorError { provider: "broken".into(), message: "503".into() })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

pub fn bot(
    config: MedibotConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
) -> Medibot {
    Medibot::builder().config(config).embedder(embedder).generator(generator).build().unwrap()
}
