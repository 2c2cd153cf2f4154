//! Embeddings from an OpenAI-compatible HTTP service (feature `openai`).
//!
//! Any server that accepts `POST {base}/embeddings` with `{model, input,
//! dimensions}` and answers `{data: [{index, embedding}]}` works: OpenAI
//! itself, or a local inference server via [`OpenAiEmbedder::with_base_url`].
//!
//! Every response is checked before it reaches the index: one vector per
//! input, each with exactly [`Embedder::dimensions`] finite components.
//! Anything else is reported as [`MedibotError::EmbedderError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::Embedder;
use crate::error::{MedibotError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const PROVIDER: &str = "openai";

/// Embeds chunks and questions through an OpenAI-compatible `/embeddings` endpoint.
///
/// The index built with one model and dimensionality can only be queried with
/// the same pair, so both are fixed when the embedder is constructed.
///
/// ```rust,ignore
/// let embedder = OpenAiEmbedder::from_env()?.with_dimensions(384);
/// let bot = Medibot::builder().embedder(Arc::new(embedder)) /* ... */;
/// ```
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimensions: usize,
    truncate_to: Option<usize>,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Returns [`MedibotError::EmbedderError`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(embedder_error("API key must not be empty"));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint: endpoint(DEFAULT_BASE_URL),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            truncate_to: None,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::EmbedderError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Self::new(key),
            Err(_) => Err(embedder_error("OPENAI_API_KEY is not set")),
        }
    }

    /// Send requests to another OpenAI-compatible server, e.g. `http://localhost:8080/v1`.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.endpoint = endpoint(base_url.as_ref());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the service to shorten vectors to `dimensions` and expect that length back.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.truncate_to = Some(dimensions);
        self
    }

    async fn request(&self, input: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest { model: &self.model, input, dimensions: self.truncate_to };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "embeddings request failed");
                embedder_error(format!("request to {} failed: {e}", self.endpoint))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| embedder_error(format!("failed to read response body: {e}")))?;
        if !status.is_success() {
            error!(%status, model = %self.model, "embeddings service rejected request");
            return Err(embedder_error(format!("{status}: {}", service_message(&text))));
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&text)
            .map_err(|e| embedder_error(format!("malformed embeddings response: {e}")))?;
        decode_vectors(parsed, input.len(), self.dimensions)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| embedder_error("no embedding returned for the question"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ServiceError {
    error: ServiceErrorBody,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    message: String,
}

fn endpoint(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn embedder_error(message: impl Into<String>) -> MedibotError {
    MedibotError::EmbedderError { provider: PROVIDER.to_string(), message: message.into() }
}

/// The service's own error message if the body carries one, else the raw body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<ServiceError>(body)
        .map_or_else(|_| body.to_string(), |e| e.error.message)
}

/// Put the response items back in input order and check their shape.
fn decode_vectors(
    response: EmbeddingsResponse,
    inputs: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; inputs];
    for item in response.data {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            embedder_error(format!("item index {} is out of range for {inputs} inputs", item.index))
        })?;
        if slot.is_some() {
            return Err(embedder_error(format!("item index {} appears twice", item.index)));
        }
        if item.embedding.len() != dimensions {
            return Err(embedder_error(format!(
                "item {} has {} dimensions, expected {dimensions}",
                item.index,
                item.embedding.len()
            )));
        }
        if item.embedding.iter().any(|x| !x.is_finite()) {
            return Err(embedder_error(format!("item {} is not finite", item.index)));
        }
        *slot = Some(item.embedding);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or_else(|| embedder_error(format!("no embedding for input {i}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> EmbeddingsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn vectors_are_returned_in_input_order() {
        let parsed = response(
            r#"{"object":"list","data":[
                {"object":"embedding","index":1,"embedding":[0.0,1.0]},
                {"object":"embedding","index":0,"embedding":[1.0,0.0]}
            ],"model":"text-embedding-3-small"}"#,
        );
        let vectors = decode_vectors(parsed, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn missing_vector_is_rejected() {
        let parsed = response(r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#);
        let err = decode_vectors(parsed, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            MedibotError::EmbedderError { ref message, .. } if message.contains("input 1")
        ));
    }

    #[test]
    fn wrong_dimensionality_is_rejected() {
        let parsed = response(r#"{"data":[{"index":0,"embedding":[1.0,0.0,0.5]}]}"#);
        let err = decode_vectors(parsed, 1, 2).unwrap_err();
        assert!(matches!(err, MedibotError::EmbedderError { .. }));
    }

    #[test]
    fn duplicate_and_out_of_range_indices_are_rejected() {
        let dup = response(
            r#"{"data":[{"index":0,"embedding":[1.0]},{"index":0,"embedding":[2.0]}]}"#,
        );
        assert!(decode_vectors(dup, 2, 1).is_err());

        let stray = response(r#"{"data":[{"index":3,"embedding":[1.0]}]}"#);
        assert!(decode_vectors(stray, 1, 1).is_err());
    }

    #[test]
    fn service_message_prefers_error_field() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(service_message(body), "Incorrect API key provided");
        assert_eq!(service_message("upstream unavailable"), "upstream unavailable");
    }

    #[test]
    fn empty_key_is_rejected_and_base_url_is_normalised() {
        assert!(OpenAiEmbedder::new("  ").is_err());
        let embedder = OpenAiEmbedder::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/")
            .with_dimensions(384);
        assert_eq!(embedder.endpoint, "http://localhost:8080/v1/embeddings");
        assert_eq!(embedder.dimensions(), 384);
    }
}
