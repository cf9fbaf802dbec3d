//! Durable storage for deskbot records.
//!
//! [`Store`] is the only serialization point for ticket and response
//! state. Every method is individually atomic; status changes are
//! compare-and-set (`transition_*` returns `false` when the record was not
//! in the expected status), so concurrent operators cannot both win.
//!
//! [`TursoStore`] implements it on libSQL, either a local file, a remote
//! Turso database, or an in-memory database for tests.

mod error;
mod turso;

pub use error::{Error, Result};
pub use turso::TursoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::channel::PausedChannel;
use crate::config::BotConfig;
use crate::feedback::Feedback;
use crate::knowledge::KnowledgeEntry;
use crate::ticket::{BotResponse, ResponseStatus, Sentiment, Ticket, TicketStatus, Urgency};
use crate::types::{KnowledgeId, ResponseId, TicketId};

#[async_trait]
pub trait Store: Send + Sync {
    // ── Knowledge ───────────────────────────────────────────────────────

    /// Every entry, newest first. This order is the corpus order.
    async fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>>;

    async fn get_knowledge(&self, id: KnowledgeId) -> Result<Option<KnowledgeEntry>>;

    async fn create_knowledge(&self, entry: &KnowledgeEntry) -> Result<()>;

    /// Returns `false` if nothing was deleted.
    async fn delete_knowledge(&self, id: KnowledgeId) -> Result<bool>;

    /// Set the embedding of an entry that has none.
    async fn set_knowledge_embedding(&self, id: KnowledgeId, embedding: &[f32]) -> Result<bool>;

    // ── Tickets ─────────────────────────────────────────────────────────

    /// Newest first, optionally capped.
    async fn list_tickets(&self, limit: Option<u32>) -> Result<Vec<Ticket>>;

    async fn list_tickets_by_channel(&self, channel_id: &str) -> Result<Vec<Ticket>>;

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>>;

    async fn create_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Set sentiment and urgency if they are still absent.
    async fn update_ticket_sentiment(
        &self,
        id: TicketId,
        sentiment: Sentiment,
        urgency: Urgency,
    ) -> Result<bool>;

    async fn transition_ticket(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<bool>;

    // ── Responses ───────────────────────────────────────────────────────

    /// Newest first, optionally for a single ticket.
    async fn list_responses(&self, ticket_id: Option<TicketId>) -> Result<Vec<BotResponse>>;

    /// Oldest first, so the approval queue is worked in arrival order.
    async fn list_responses_by_status(&self, status: ResponseStatus) -> Result<Vec<BotResponse>>;

    /// Approved responses with no transport message id, oldest first.
    async fn list_undelivered_responses(&self) -> Result<Vec<BotResponse>>;

    async fn get_response(&self, id: ResponseId) -> Result<Option<BotResponse>>;

    async fn find_response_by_message_id(&self, message_id: &str) -> Result<Option<BotResponse>>;

    async fn create_response(&self, response: &BotResponse) -> Result<()>;

    async fn transition_response(
        &self,
        id: ResponseId,
        from: ResponseStatus,
        to: ResponseStatus,
    ) -> Result<bool>;

    /// Record delivery of an `approved` response: `approved` → `sent`.
    async fn mark_response_sent(
        &self,
        id: ResponseId,
        message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool>;

    // ── Feedback ────────────────────────────────────────────────────────

    /// Oldest first, optionally for a single response.
    async fn list_feedback(&self, response_id: Option<ResponseId>) -> Result<Vec<Feedback>>;

    async fn create_feedback(&self, feedback: &Feedback) -> Result<()>;

    // ── Config ──────────────────────────────────────────────────────────

    /// The singleton config, created with defaults on first read.
    async fn get_config(&self) -> Result<BotConfig>;

    async fn save_config(&self, config: &BotConfig) -> Result<()>;

    // ── Paused channels ─────────────────────────────────────────────────

    /// Insert if absent; returns whichever row is stored for the channel.
    async fn pause_channel(&self, channel: &PausedChannel) -> Result<PausedChannel>;

    /// Returns `false` if the channel was not paused.
    async fn resume_channel(&self, channel_id: &str) -> Result<bool>;

    async fn is_channel_paused(&self, channel_id: &str) -> Result<bool>;

    async fn list_paused_channels(&self) -> Result<Vec<PausedChannel>>;
}
