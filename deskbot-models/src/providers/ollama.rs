//! Ollama local model provider.
//!
//! Runs both capabilities against a local Ollama instance, so a deployment
//! can answer tickets without any cloud credentials.
//!
//! # Example
//!
//! ```ignore
//! use deskbot_models::OllamaProvider;
//!
//! let provider = OllamaProvider::new();  // localhost:11434, llama3.2 + nomic-embed-text
//! let provider = OllamaProvider::with_base_url("http://192.168.1.100:11434")
//!     .with_chat_model("mistral:7b");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CompletionProvider, CompletionRequest, Embedding, EmbeddingProvider, OutputFormat};
use crate::{Error, Result};

/// Default Ollama API base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "llama3.2";

/// Default embedding model.
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

// ────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ────────────────────────────────────────────────────────────────────────────

/// Message in an Ollama chat request/response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaChatOptions>,
}

/// Chat options for Ollama.
#[derive(Debug, Serialize)]
pub struct OllamaChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response from Ollama's `/api/chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub message: OllamaChatMessage,
    pub done: bool,
}

/// Request body for Ollama's `/api/embed` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaEmbedRequest {
    pub model: String,
    pub input: String,
}

/// Response from Ollama's `/api/embed` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaEmbedResponse {
    pub embeddings: Vec<Embedding>,
}

impl OllamaChatRequest {
    fn from_completion(model: &str, request: CompletionRequest) -> Self {
        let messages = vec![
            OllamaChatMessage {
                role: "system".to_string(),
                content: request.system_instruction,
            },
            OllamaChatMessage {
                role: "user".to_string(),
                content: request.user_text,
            },
        ];

        Self {
            model: model.to_string(),
            messages,
            stream: false,
            format: match request.format {
                OutputFormat::Json => Some("json".to_string()),
                OutputFormat::Text => None,
            },
            options: request.max_tokens.map(|n| OllamaChatOptions {
                num_predict: Some(n),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OllamaProvider
// ────────────────────────────────────────────────────────────────────────────

/// Ollama local model provider.
pub struct OllamaProvider {
    base_url: String,
    chat_model: String,
    embed_model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default URL (localhost:11434).
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new Ollama provider with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Use a different chat model.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Use a different embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Get the base URL for this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %self.chat_model), level = "debug")]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = OllamaChatRequest::from_completion(&self.chat_model, request);
        let response: OllamaChatResponse = self.post("/api/chat", &body).await?;
        debug!(done = response.done, "ollama chat finished");
        Ok(response.message.content)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, text), fields(model = %self.embed_model), level = "debug")]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let body = OllamaEmbedRequest {
            model: self.embed_model.clone(),
            input: text.to_string(),
        };
        let response: OllamaEmbedResponse = self.post("/api/embed", &body).await?;
        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyResponse("ollama".to_string()))
    }
}
