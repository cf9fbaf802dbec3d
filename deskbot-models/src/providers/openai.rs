//! OpenAI-compatible provider.
//!
//! Speaks the `/embeddings` and `/chat/completions` dialect, which covers
//! OpenAI itself and Gemini's OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{CompletionProvider, CompletionRequest, Embedding, EmbeddingProvider, OutputFormat};
use crate::auth::ApiKey;
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

// ────────────────────────────────────────────────────────────────────────────
// Wire Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Embedding,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatRequest {
    fn from_completion(model: &str, request: CompletionRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(request.system_instruction),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(request.user_text),
                },
            ],
            max_tokens: request.max_tokens,
            response_format: match request.format {
                OutputFormat::Json => Some(ResponseFormat {
                    kind: "json_object",
                }),
                OutputFormat::Text => None,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAiProvider
// ────────────────────────────────────────────────────────────────────────────

/// Provider for any OpenAI-compatible HTTP API.
pub struct OpenAiProvider {
    name: &'static str,
    base_url: String,
    api_key: Option<ApiKey>,
    embedding_model: String,
    completion_model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// OpenAI defaults: `text-embedding-3-small` and `gpt-4o-mini`.
    pub fn openai() -> Self {
        Self {
            name: "openai",
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Gemini through its OpenAI-compatible endpoint.
    pub fn gemini() -> Self {
        Self {
            name: "gemini",
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: None,
            embedding_model: "text-embedding-004".to_string(),
            completion_model: "gemini-2.5-flash".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "{} API returned {}: {}",
                self.name, status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    #[instrument(skip(self, text), fields(provider = self.name, model = %self.embedding_model), level = "debug")]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let body = EmbeddingsRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingsResponse = self.post("/embeddings", &body).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::EmptyResponse(self.name.to_string()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    #[instrument(skip(self, request), fields(provider = self.name, model = %self.completion_model), level = "debug")]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatRequest::from_completion(&self.completion_model, request);
        let response: ChatResponse = self.post("/chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::EmptyResponse(self.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_point_at_their_endpoints() {
        assert_eq!(OpenAiProvider::openai().base_url(), OPENAI_BASE_URL);
        assert_eq!(OpenAiProvider::gemini().base_url(), GEMINI_BASE_URL);
        assert_eq!(EmbeddingProvider::name(&OpenAiProvider::gemini()), "gemini");
    }

    #[test]
    fn with_base_url_strips_trailing_slash() {
        let provider = OpenAiProvider::openai().with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn text_request_omits_response_format() {
        let request = CompletionRequest::new("sys", "question").with_max_tokens(500);
        let body = ChatRequest::from_completion("gpt-4o-mini", request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "question");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn json_request_asks_for_json_object() {
        let body = ChatRequest::from_completion("m", CompletionRequest::new("s", "u").json());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn parse_chat_response_takes_first_choice() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Olá!"}, "finish_reason": "stop"}
            ]
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Olá!"));
    }

    #[test]
    fn parse_chat_response_tolerates_null_content() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[test]
    fn parse_embeddings_response() {
        let json = r#"{
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.5, 0.25]}],
            "model": "text-embedding-3-small"
        }"#;
        let response: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data[0].embedding, vec![0.5, 0.25]);
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY and network access"]
    async fn integration_embed_against_openai() {
        let key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY set");
        let provider = OpenAiProvider::openai().with_api_key(ApiKey::new(key));

        let vector = provider.embed("como redefinir minha senha").await.unwrap();
        assert!(!vector.is_empty());
    }
}
