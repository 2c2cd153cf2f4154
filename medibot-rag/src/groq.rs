//! Generator backed by Groq's OpenAI-compatible chat completions API.
//!
//! This module is only available when the `groq` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{MedibotError, Result};
use crate::generation::Generator;
use crate::prompt::Prompt;

/// The Groq OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The default Groq chat model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const PROVIDER: &str = "Groq";

/// A [`Generator`] that sends the prompt to Groq as a system + user turn.
///
/// # Configuration
///
/// - `model` – defaults to `llama-3.1-8b-instant`.
/// - `temperature` – defaults to `0.5`.
/// - `max_tokens` – defaults to `512`.
/// - `api_key` – from the constructor or the `GROQ_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use medibot_rag::groq::GroqGenerator;
///
/// let generator = GroqGenerator::from_env()?.with_temperature(0.2);
/// ```
pub struct GroqGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqGenerator {
    /// Create a new generator with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::GeneratorError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(generator_error("API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GROQ_API_BASE.into(),
            model: DEFAULT_MODEL.into(),
            temperature: 0.5,
            max_tokens: 512,
        })
    }

    /// Create a new generator using the `GROQ_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`MedibotError::GeneratorError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| generator_error("GROQ_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Point at another OpenAI-compatible chat completions server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature, clamped to `[0, 2]`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn generator_error(message: impl Into<String>) -> MedibotError {
    MedibotError::GeneratorError { provider: PROVIDER.into(), message: message.into() }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl Generator for GroqGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let user = prompt.user();
        let request_body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: prompt.system() },
                ChatMessage { role: "user", content: &user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(provider = PROVIDER, model = %self.model, prompt_len = user.len(), "generating");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                generator_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(generator_error(format!("API returned {status}: {detail}")));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            generator_error(format!("failed to parse response: {e}"))
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| generator_error("API returned no choices"))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
