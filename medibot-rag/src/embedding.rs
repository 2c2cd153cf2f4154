//! Embedding capability and the offline hashing embedder.

use async_trait::async_trait;

use crate::error::{MedibotError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface and must be dimension-stable for the lifetime of an index. The
/// default [`embed_batch`](Embedder::embed_batch) implementation calls
/// [`embed`](Embedder::embed) sequentially; backends that support native
/// batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use medibot_rag::Embedder;
///
/// let embedding = embedder.embed("What reduces fever?").await?;
/// assert_eq!(embedding.len(), embedder.dimensions());
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// A deterministic bag-of-words embedder that needs no model or network.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimensions` buckets with a hash-derived sign, and the result is
/// L2-normalised. Texts sharing vocabulary get high cosine similarity, which
/// is enough for offline use, demos and tests. Text without any tokens maps
/// to the zero vector.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a hashing embedder producing `dimensions`-long vectors.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::ConfigError`] if `dimensions == 0`.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(MedibotError::ConfigError(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn embeddings_are_normalised_and_stable() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed("Aspirin reduces fever").await.unwrap();
        let b = embedder.embed("aspirin, reduces FEVER!").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new(512).unwrap();
        let q = embedder.embed("What reduces fever?").await.unwrap();
        let aspirin = embedder.embed("Aspirin reduces fever.").await.unwrap();
        let ibuprofen = embedder.embed("Ibuprofen reduces inflammation.").await.unwrap();
        assert!(cosine(&q, &aspirin) > cosine(&q, &ibuprofen));
    }

    #[tokio::test]
    async fn tokenless_text_maps_to_zero_vector() {
        let embedder = HashEmbedder::new(8).unwrap();
        let v = embedder.embed(" \n\n ").await.unwrap();
        assert_eq!(v, vec![0.0; 8]);
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(HashEmbedder::new(0), Err(MedibotError::ConfigError(_))));
    }
}
