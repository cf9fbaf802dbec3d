//! Outbound delivery of responses to the chat platform.
//!
//! The platform adapter is reached through [`DeliverySink`]. [`WebhookSink`]
//! posts to an adapter over HTTP; [`DisabledSink`] refuses every send so
//! nothing is ever recorded as delivered without a transport.

use async_trait::async_trait;
use deskbot_models::auth::ApiKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::DeliveryError;

/// Message length ceiling of the reference platform, in characters.
pub const DEFAULT_MESSAGE_LIMIT: usize = 2000;

/// Appended to content cut down to the transport limit.
pub const TRUNCATION_MARKER: &str = "\n\n... (mensagem truncada)";

type Result<T> = std::result::Result<T, DeliveryError>;

/// Outbound side of the chat platform.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Post `text` to a channel and return the transport message id.
    async fn send(&self, channel_id: &str, text: &str) -> Result<String>;

    /// Attach the two feedback reactions to a delivered message.
    async fn react_two_way(&self, message_id: &str, positive: &str, negative: &str) -> Result<()>;

    /// Longest message the transport accepts, in characters.
    fn message_limit(&self) -> usize {
        DEFAULT_MESSAGE_LIMIT
    }
}

/// Fit `content` within `limit` characters, marking it when cut and the
/// limit leaves room for the marker.
pub fn truncate_for_transport(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let marker_chars = TRUNCATION_MARKER.chars().count();
    if limit <= marker_chars {
        return content.chars().take(limit).collect();
    }
    let keep = limit - marker_chars;
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

// ────────────────────────────────────────────────────────────────────────────
// WebhookSink
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    channel_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    message_id: String,
}

#[derive(Debug, Serialize)]
struct ReactionsRequest<'a> {
    message_id: &'a str,
    emojis: [&'a str; 2],
}

/// Delivers through a platform adapter's HTTP endpoint.
///
/// `POST {base}/messages` with `{channel_id, content}` answers
/// `{message_id}`; `POST {base}/reactions` adds reactions.
pub struct WebhookSink {
    base_url: String,
    token: Option<ApiKey>,
    message_limit: usize,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            client: reqwest::Client::new(),
        }
    }

    /// Authenticate with a bearer token.
    pub fn with_token(mut self, token: ApiKey) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    #[instrument(skip(self, text), level = "debug")]
    async fn send(&self, channel_id: &str, text: &str) -> Result<String> {
        let response = self
            .post("/messages")
            .json(&SendMessageRequest {
                channel_id,
                content: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Send(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        let sent: SendMessageResponse = response.json().await?;
        debug!(message_id = %sent.message_id, "message delivered");
        Ok(sent.message_id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn react_two_way(&self, message_id: &str, positive: &str, negative: &str) -> Result<()> {
        let response = self
            .post("/reactions")
            .json(&ReactionsRequest {
                message_id,
                emojis: [positive, negative],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Send(format!(
                "webhook returned {} for reactions",
                response.status()
            )));
        }
        Ok(())
    }

    fn message_limit(&self) -> usize {
        self.message_limit
    }
}

/// Sink used when no transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

#[async_trait]
impl DeliverySink for DisabledSink {
    async fn send(&self, _channel_id: &str, _text: &str) -> Result<String> {
        Err(DeliveryError::NotConfigured)
    }

    async fn react_two_way(&self, _message_id: &str, _positive: &str, _negative: &str) -> Result<()> {
        Err(DeliveryError::NotConfigured)
    }
}
