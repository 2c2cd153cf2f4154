//! Question-to-chunks retrieval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::document::RetrievalResult;
use crate::embedding::Embedder;
use crate::error::{MedibotError, Result};
use crate::index::{VectorIndex, is_finite, l2_norm};

/// Await an external call, failing with [`MedibotError::UpstreamTimeout`]
/// once `timeout` elapses.
pub(crate) async fn with_deadline<T>(
    stage: &'static str,
    timeout: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
        warn!(stage, ?timeout, "upstream call timed out");
        Err(MedibotError::UpstreamTimeout { stage, timeout })
    })
}

/// Embeds a question and ranks the chunks of one index against it.
///
/// A retriever is cheap to construct; the pipeline creates one per query
/// from the index handle that is current when the query starts.
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
    min_score: Option<f32>,
}

impl Retriever {
    /// Create a retriever over `index` using `embedder` for questions.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { index, embedder, timeout, min_score: None }
    }

    /// Drop hits scoring below `min_score`, if set.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Return up to `k` chunks ranked by similarity to `question`.
    ///
    /// `k == 0` returns an empty result without calling the embedder. An empty
    /// index, or a question that embeds to the zero vector, yields an empty
    /// result, which means "no relevant context".
    ///
    /// # Errors
    ///
    /// - [`MedibotError::EmbeddingUnavailable`] if the embedder fails or
    ///   returns an empty, wrongly sized or non-finite vector.
    /// - [`MedibotError::UpstreamTimeout`] if the embedder does not answer in time.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let vector = with_deadline("embedder", self.timeout, self.embedder.embed(question))
            .await
            .map_err(|e| match e {
                timeout @ MedibotError::UpstreamTimeout { .. } => timeout,
                other => {
                    error!(error = %other, "question embedding failed");
                    MedibotError::EmbeddingUnavailable(other.to_string())
                }
            })?;

        if vector.is_empty() {
            error!("embedder returned an empty vector");
            return Err(MedibotError::EmbeddingUnavailable(
                "embedder returned an empty vector".to_string(),
            ));
        }
        if let Some(expected) = self.index.dimensions() {
            if vector.len() != expected {
                error!(expected, actual = vector.len(), "embedder returned wrong dimensionality");
                return Err(MedibotError::EmbeddingUnavailable(format!(
                    "embedder returned {} dimensions, index expects {expected}",
                    vector.len()
                )));
            }
        }

        if !is_finite(&vector) {
            error!("embedder returned a non-finite vector");
            return Err(MedibotError::EmbeddingUnavailable(
                "embedder returned a vector with NaN or infinite components".to_string(),
            ));
        }
        // a question with no tokens embeds to zero and scores 0.0 against every chunk
        if l2_norm(&vector) == 0.0 {
            debug!("question embedded to a zero vector");
            return Ok(RetrievalResult::empty());
        }

        let mut result = self.index.query(&vector, k)?;
        if let Some(threshold) = self.min_score {
            result.hits.retain(|hit| hit.score >= threshold);
        }

        debug!(k, hits = result.len(), "retrieved chunks");
        Ok(result)
    }
}
