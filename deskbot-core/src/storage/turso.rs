//! Turso/libSQL implementation of [`Store`].
//!
//! It can connect to:
//! - Remote Turso database (cloud)
//! - Local embedded SQLite file
//! - In-memory database (tests)

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database};
use tracing::{debug, instrument};

use super::{Error, Result, Store};
use crate::channel::PausedChannel;
use crate::config::BotConfig;
use crate::feedback::Feedback;
use crate::knowledge::KnowledgeEntry;
use crate::ticket::{BotResponse, ResponseStatus, Sentiment, Ticket, TicketStatus, Urgency};
use crate::types::{FeedbackId, KnowledgeId, PausedChannelId, ResponseId, TicketId};

/// Id of the singleton config row.
const CONFIG_ROW_ID: &str = "default";

const SCHEMA_KNOWLEDGE: &str = r#"
CREATE TABLE IF NOT EXISTS knowledge_entries (
    id TEXT PRIMARY KEY,
    subject TEXT NOT NULL,
    information TEXT NOT NULL,
    embedding TEXT,
    created_at TEXT NOT NULL
)
"#;

const SCHEMA_TICKETS: &str = r#"
CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL,
    channel_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    username TEXT NOT NULL,
    content TEXT NOT NULL,
    sentiment TEXT,
    urgency TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

const SCHEMA_RESPONSES: &str = r#"
CREATE TABLE IF NOT EXISTS bot_responses (
    id TEXT PRIMARY KEY,
    ticket_id TEXT NOT NULL,
    content TEXT NOT NULL,
    status TEXT NOT NULL,
    message_id TEXT,
    sent_at TEXT,
    created_at TEXT NOT NULL
)
"#;

const SCHEMA_FEEDBACK: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY,
    response_id TEXT NOT NULL,
    ticket_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    rating INTEGER NOT NULL,
    created_at TEXT NOT NULL
)
"#;

const SCHEMA_CONFIG: &str = r#"
CREATE TABLE IF NOT EXISTS bot_config (
    id TEXT PRIMARY KEY,
    auto_respond INTEGER NOT NULL,
    require_approval INTEGER NOT NULL,
    response_delay_ms INTEGER NOT NULL,
    max_tokens INTEGER NOT NULL,
    system_prompt TEXT NOT NULL,
    fallback_message TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

const SCHEMA_PAUSED_CHANNELS: &str = r#"
CREATE TABLE IF NOT EXISTS paused_channels (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL UNIQUE,
    guild_id TEXT NOT NULL,
    channel_name TEXT NOT NULL,
    paused_at TEXT NOT NULL
)
"#;

const INDEX_TICKETS_CHANNEL: &str =
    "CREATE INDEX IF NOT EXISTS idx_tickets_channel ON tickets(channel_id, created_at)";
const INDEX_RESPONSES_TICKET: &str =
    "CREATE INDEX IF NOT EXISTS idx_responses_ticket ON bot_responses(ticket_id)";
const INDEX_RESPONSES_MESSAGE: &str =
    "CREATE INDEX IF NOT EXISTS idx_responses_message ON bot_responses(message_id)";
const INDEX_FEEDBACK_RESPONSE: &str =
    "CREATE INDEX IF NOT EXISTS idx_feedback_response ON feedback(response_id)";

const KNOWLEDGE_COLUMNS: &str = "id, subject, information, embedding, created_at";
const TICKET_COLUMNS: &str =
    "id, channel_id, channel_name, user_id, username, content, sentiment, urgency, status, created_at";
const RESPONSE_COLUMNS: &str = "id, ticket_id, content, status, message_id, sent_at, created_at";
const FEEDBACK_COLUMNS: &str = "id, response_id, ticket_id, user_id, rating, created_at";
const CONFIG_COLUMNS: &str = "auto_respond, require_approval, response_delay_ms, max_tokens, system_prompt, fallback_message, updated_at";
const PAUSED_COLUMNS: &str = "id, channel_id, guild_id, channel_name, paused_at";

/// Turso-backed deskbot storage.
///
/// Holds one connection for its lifetime, so an in-memory database keeps
/// its tables across calls.
#[derive(Clone)]
pub struct TursoStore {
    _db: Arc<Database>,
    conn: Connection,
}

impl TursoStore {
    /// Create a new storage instance with a local embedded database.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::open(db).await
    }

    /// Create a new storage instance connected to a remote Turso database.
    pub async fn new_remote(url: &str, token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await?;
        Self::open(db).await
    }

    /// Create a new in-memory storage instance (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db).await
    }

    async fn open(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        let store = Self {
            _db: Arc::new(db),
            conn,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Ensure the database schema exists.
    async fn ensure_schema(&self) -> Result<()> {
        for statement in [
            SCHEMA_KNOWLEDGE,
            SCHEMA_TICKETS,
            SCHEMA_RESPONSES,
            SCHEMA_FEEDBACK,
            SCHEMA_CONFIG,
            SCHEMA_PAUSED_CHANNELS,
            INDEX_TICKETS_CHANNEL,
            INDEX_RESPONSES_TICKET,
            INDEX_RESPONSES_MESSAGE,
            INDEX_FEEDBACK_RESPONSE,
        ] {
            self.conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    async fn query_all<T>(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        parse: fn(&libsql::Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(parse(&row)?);
        }
        Ok(items)
    }

    async fn query_one<T>(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        parse: fn(&libsql::Row) -> Result<T>,
    ) -> Result<Option<T>> {
        let mut rows = self.conn.query(sql, params).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(parse(&row)?)),
            None => Ok(None),
        }
    }

    /// Parse a knowledge entry from a database row.
    fn parse_knowledge(row: &libsql::Row) -> Result<KnowledgeEntry> {
        let id_str: String = row.get(0)?;
        let subject: String = row.get(1)?;
        let information: String = row.get(2)?;
        let embedding_json: Option<String> = row.get(3)?;
        let created_at_str: String = row.get(4)?;

        let embedding = embedding_json
            .map(|json| serde_json::from_str::<Vec<f32>>(&json))
            .transpose()?;

        Ok(KnowledgeEntry {
            id: KnowledgeId(parse_id(&id_str, "knowledge id")?),
            subject,
            information,
            embedding,
            created_at: parse_datetime(&created_at_str)?,
        })
    }

    /// Parse a ticket from a database row.
    fn parse_ticket(row: &libsql::Row) -> Result<Ticket> {
        let id_str: String = row.get(0)?;
        let channel_id: String = row.get(1)?;
        let channel_name: String = row.get(2)?;
        let user_id: String = row.get(3)?;
        let username: String = row.get(4)?;
        let content: String = row.get(5)?;
        let sentiment_str: Option<String> = row.get(6)?;
        let urgency_str: Option<String> = row.get(7)?;
        let status_str: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;

        let sentiment = sentiment_str
            .map(|s| {
                Sentiment::parse(&s)
                    .ok_or_else(|| Error::InvalidData(format!("invalid sentiment: {}", s)))
            })
            .transpose()?;
        let urgency = urgency_str
            .map(|s| {
                Urgency::parse(&s)
                    .ok_or_else(|| Error::InvalidData(format!("invalid urgency: {}", s)))
            })
            .transpose()?;
        let status = TicketStatus::parse(&status_str)
            .ok_or_else(|| Error::InvalidData(format!("invalid ticket status: {}", status_str)))?;

        Ok(Ticket {
            id: TicketId(parse_id(&id_str, "ticket id")?),
            channel_id,
            channel_name,
            user_id,
            username,
            content,
            sentiment,
            urgency,
            status,
            created_at: parse_datetime(&created_at_str)?,
        })
    }

    /// Parse a bot response from a database row.
    fn parse_response(row: &libsql::Row) -> Result<BotResponse> {
        let id_str: String = row.get(0)?;
        let ticket_id_str: String = row.get(1)?;
        let content: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let message_id: Option<String> = row.get(4)?;
        let sent_at_str: Option<String> = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        let status = ResponseStatus::parse(&status_str).ok_or_else(|| {
            Error::InvalidData(format!("invalid response status: {}", status_str))
        })?;

        Ok(BotResponse {
            id: ResponseId(parse_id(&id_str, "response id")?),
            ticket_id: TicketId(parse_id(&ticket_id_str, "ticket id")?),
            content,
            status,
            message_id,
            sent_at: sent_at_str.as_deref().map(parse_datetime).transpose()?,
            created_at: parse_datetime(&created_at_str)?,
        })
    }

    /// Parse a feedback row.
    fn parse_feedback(row: &libsql::Row) -> Result<Feedback> {
        let id_str: String = row.get(0)?;
        let response_id_str: String = row.get(1)?;
        let ticket_id_str: String = row.get(2)?;
        let user_id: String = row.get(3)?;
        let rating: i64 = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let rating = u8::try_from(rating)
            .map_err(|_| Error::InvalidData(format!("invalid rating: {}", rating)))?;

        Ok(Feedback {
            id: FeedbackId(parse_id(&id_str, "feedback id")?),
            response_id: ResponseId(parse_id(&response_id_str, "response id")?),
            ticket_id: TicketId(parse_id(&ticket_id_str, "ticket id")?),
            user_id,
            rating,
            created_at: parse_datetime(&created_at_str)?,
        })
    }

    /// Parse the config row.
    fn parse_config(row: &libsql::Row) -> Result<BotConfig> {
        let auto_respond: i64 = row.get(0)?;
        let require_approval: i64 = row.get(1)?;
        let response_delay_ms: i64 = row.get(2)?;
        let max_tokens: i64 = row.get(3)?;
        let system_prompt: String = row.get(4)?;
        let fallback_message: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        Ok(BotConfig {
            auto_respond: auto_respond != 0,
            require_approval: require_approval != 0,
            response_delay_ms: u64::try_from(response_delay_ms).map_err(|_| {
                Error::InvalidData(format!("invalid response delay: {}", response_delay_ms))
            })?,
            max_tokens: u32::try_from(max_tokens)
                .map_err(|_| Error::InvalidData(format!("invalid max tokens: {}", max_tokens)))?,
            system_prompt,
            fallback_message,
            updated_at: parse_datetime(&updated_at_str)?,
        })
    }

    /// Parse a paused-channel row.
    fn parse_paused(row: &libsql::Row) -> Result<PausedChannel> {
        let id_str: String = row.get(0)?;
        let channel_id: String = row.get(1)?;
        let guild_id: String = row.get(2)?;
        let channel_name: String = row.get(3)?;
        let paused_at_str: String = row.get(4)?;

        Ok(PausedChannel {
            id: PausedChannelId(parse_id(&id_str, "paused channel id")?),
            channel_id,
            guild_id,
            channel_name,
            paused_at: parse_datetime(&paused_at_str)?,
        })
    }
}

#[async_trait]
impl Store for TursoStore {
    #[instrument(skip(self), level = "debug")]
    async fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        self.query_all(
            &format!(
                "SELECT {} FROM knowledge_entries ORDER BY created_at DESC, id DESC",
                KNOWLEDGE_COLUMNS
            ),
            (),
            Self::parse_knowledge,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_knowledge(&self, id: KnowledgeId) -> Result<Option<KnowledgeEntry>> {
        self.query_one(
            &format!("SELECT {} FROM knowledge_entries WHERE id = ?", KNOWLEDGE_COLUMNS),
            [id.to_string()],
            Self::parse_knowledge,
        )
        .await
    }

    #[instrument(skip(self, entry), fields(id = %entry.id), level = "debug")]
    async fn create_knowledge(&self, entry: &KnowledgeEntry) -> Result<()> {
        let embedding_json = entry
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn
            .execute(
                "INSERT INTO knowledge_entries (id, subject, information, embedding, created_at) VALUES (?, ?, ?, ?, ?)",
                libsql::params![
                    entry.id.to_string(),
                    entry.subject.clone(),
                    entry.information.clone(),
                    embedding_json,
                    format_datetime(entry.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_knowledge(&self, id: KnowledgeId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM knowledge_entries WHERE id = ?", [id.to_string()])
            .await?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, embedding), level = "debug")]
    async fn set_knowledge_embedding(&self, id: KnowledgeId, embedding: &[f32]) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE knowledge_entries SET embedding = ? WHERE id = ? AND embedding IS NULL",
                libsql::params![serde_json::to_string(embedding)?, id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_tickets(&self, limit: Option<u32>) -> Result<Vec<Ticket>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(i64::from).unwrap_or(-1);
        self.query_all(
            &format!(
                "SELECT {} FROM tickets ORDER BY created_at DESC, id DESC LIMIT ?",
                TICKET_COLUMNS
            ),
            [limit],
            Self::parse_ticket,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_tickets_by_channel(&self, channel_id: &str) -> Result<Vec<Ticket>> {
        self.query_all(
            &format!(
                "SELECT {} FROM tickets WHERE channel_id = ? ORDER BY created_at DESC, id DESC",
                TICKET_COLUMNS
            ),
            [channel_id],
            Self::parse_ticket,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        self.query_one(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            [id.to_string()],
            Self::parse_ticket,
        )
        .await
    }

    #[instrument(skip(self, ticket), fields(id = %ticket.id), level = "debug")]
    async fn create_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO tickets (id, channel_id, channel_name, user_id, username, content, sentiment, urgency, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    ticket.id.to_string(),
                    ticket.channel_id.clone(),
                    ticket.channel_name.clone(),
                    ticket.user_id.clone(),
                    ticket.username.clone(),
                    ticket.content.clone(),
                    ticket.sentiment.map(|s| s.as_str()),
                    ticket.urgency.map(|u| u.as_str()),
                    ticket.status.as_str(),
                    format_datetime(ticket.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_ticket_sentiment(
        &self,
        id: TicketId,
        sentiment: Sentiment,
        urgency: Urgency,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE tickets SET sentiment = ?, urgency = ? WHERE id = ? AND sentiment IS NULL",
                libsql::params![sentiment.as_str(), urgency.as_str(), id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn transition_ticket(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE tickets SET status = ? WHERE id = ? AND status = ?",
                libsql::params![to.as_str(), id.to_string(), from.as_str()],
            )
            .await?;
        debug!(%id, %from, %to, applied = updated > 0, "ticket transition");
        Ok(updated > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_responses(&self, ticket_id: Option<TicketId>) -> Result<Vec<BotResponse>> {
        match ticket_id {
            Some(ticket_id) => {
                self.query_all(
                    &format!(
                        "SELECT {} FROM bot_responses WHERE ticket_id = ? ORDER BY created_at DESC, id DESC",
                        RESPONSE_COLUMNS
                    ),
                    [ticket_id.to_string()],
                    Self::parse_response,
                )
                .await
            }
            None => {
                self.query_all(
                    &format!(
                        "SELECT {} FROM bot_responses ORDER BY created_at DESC, id DESC",
                        RESPONSE_COLUMNS
                    ),
                    (),
                    Self::parse_response,
                )
                .await
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_responses_by_status(&self, status: ResponseStatus) -> Result<Vec<BotResponse>> {
        self.query_all(
            &format!(
                "SELECT {} FROM bot_responses WHERE status = ? ORDER BY created_at ASC, id ASC",
                RESPONSE_COLUMNS
            ),
            [status.as_str()],
            Self::parse_response,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_undelivered_responses(&self) -> Result<Vec<BotResponse>> {
        self.query_all(
            &format!(
                "SELECT {} FROM bot_responses WHERE status = ? AND message_id IS NULL ORDER BY created_at ASC, id ASC",
                RESPONSE_COLUMNS
            ),
            [ResponseStatus::Approved.as_str()],
            Self::parse_response,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_response(&self, id: ResponseId) -> Result<Option<BotResponse>> {
        self.query_one(
            &format!("SELECT {} FROM bot_responses WHERE id = ?", RESPONSE_COLUMNS),
            [id.to_string()],
            Self::parse_response,
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_response_by_message_id(&self, message_id: &str) -> Result<Option<BotResponse>> {
        self.query_one(
            &format!(
                "SELECT {} FROM bot_responses WHERE message_id = ? LIMIT 1",
                RESPONSE_COLUMNS
            ),
            [message_id],
            Self::parse_response,
        )
        .await
    }

    #[instrument(skip(self, response), fields(id = %response.id), level = "debug")]
    async fn create_response(&self, response: &BotResponse) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO bot_responses (id, ticket_id, content, status, message_id, sent_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    response.id.to_string(),
                    response.ticket_id.to_string(),
                    response.content.clone(),
                    response.status.as_str(),
                    response.message_id.clone(),
                    response.sent_at.map(format_datetime),
                    format_datetime(response.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn transition_response(
        &self,
        id: ResponseId,
        from: ResponseStatus,
        to: ResponseStatus,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE bot_responses SET status = ? WHERE id = ? AND status = ?",
                libsql::params![to.as_str(), id.to_string(), from.as_str()],
            )
            .await?;
        debug!(%id, %from, %to, applied = updated > 0, "response transition");
        Ok(updated > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn mark_response_sent(
        &self,
        id: ResponseId,
        message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE bot_responses SET status = ?, message_id = ?, sent_at = ? WHERE id = ? AND status = ?",
                libsql::params![
                    ResponseStatus::Sent.as_str(),
                    message_id,
                    format_datetime(sent_at),
                    id.to_string(),
                    ResponseStatus::Approved.as_str()
                ],
            )
            .await?;
        Ok(updated > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_feedback(&self, response_id: Option<ResponseId>) -> Result<Vec<Feedback>> {
        match response_id {
            Some(response_id) => {
                self.query_all(
                    &format!(
                        "SELECT {} FROM feedback WHERE response_id = ? ORDER BY created_at ASC, id ASC",
                        FEEDBACK_COLUMNS
                    ),
                    [response_id.to_string()],
                    Self::parse_feedback,
                )
                .await
            }
            None => {
                self.query_all(
                    &format!(
                        "SELECT {} FROM feedback ORDER BY created_at ASC, id ASC",
                        FEEDBACK_COLUMNS
                    ),
                    (),
                    Self::parse_feedback,
                )
                .await
            }
        }
    }

    #[instrument(skip(self, feedback), fields(id = %feedback.id), level = "debug")]
    async fn create_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO feedback (id, response_id, ticket_id, user_id, rating, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    feedback.id.to_string(),
                    feedback.response_id.to_string(),
                    feedback.ticket_id.to_string(),
                    feedback.user_id.clone(),
                    i64::from(feedback.rating),
                    format_datetime(feedback.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_config(&self) -> Result<BotConfig> {
        let select = format!("SELECT {} FROM bot_config WHERE id = ?", CONFIG_COLUMNS);
        if let Some(config) = self
            .query_one(&select, [CONFIG_ROW_ID], Self::parse_config)
            .await?
        {
            return Ok(config);
        }

        debug!("creating default bot config");
        let defaults = BotConfig::default();
        self.conn
            .execute(
                &format!(
                    "INSERT INTO bot_config (id, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
                    CONFIG_COLUMNS
                ),
                config_params(&defaults),
            )
            .await?;

        self.query_one(&select, [CONFIG_ROW_ID], Self::parse_config)
            .await?
            .ok_or_else(|| Error::InvalidData("bot config row missing after insert".into()))
    }

    #[instrument(skip(self, config), level = "debug")]
    async fn save_config(&self, config: &BotConfig) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO bot_config (id, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(id) DO UPDATE SET \
                     auto_respond = excluded.auto_respond, \
                     require_approval = excluded.require_approval, \
                     response_delay_ms = excluded.response_delay_ms, \
                     max_tokens = excluded.max_tokens, \
                     system_prompt = excluded.system_prompt, \
                     fallback_message = excluded.fallback_message, \
                     updated_at = excluded.updated_at",
                    CONFIG_COLUMNS
                ),
                config_params(config),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, channel), fields(channel_id = %channel.channel_id), level = "debug")]
    async fn pause_channel(&self, channel: &PausedChannel) -> Result<PausedChannel> {
        self.conn
            .execute(
                "INSERT INTO paused_channels (id, channel_id, guild_id, channel_name, paused_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT(channel_id) DO NOTHING",
                libsql::params![
                    channel.id.to_string(),
                    channel.channel_id.clone(),
                    channel.guild_id.clone(),
                    channel.channel_name.clone(),
                    format_datetime(channel.paused_at)
                ],
            )
            .await?;

        self.query_one(
            &format!(
                "SELECT {} FROM paused_channels WHERE channel_id = ?",
                PAUSED_COLUMNS
            ),
            [channel.channel_id.as_str()],
            Self::parse_paused,
        )
        .await?
        .ok_or_else(|| Error::InvalidData("paused channel row missing after insert".into()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn resume_channel(&self, channel_id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM paused_channels WHERE channel_id = ?", [channel_id])
            .await?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn is_channel_paused(&self, channel_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM paused_channels WHERE channel_id = ? LIMIT 1",
                [channel_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_paused_channels(&self) -> Result<Vec<PausedChannel>> {
        self.query_all(
            &format!(
                "SELECT {} FROM paused_channels ORDER BY paused_at ASC",
                PAUSED_COLUMNS
            ),
            (),
            Self::parse_paused,
        )
        .await
    }
}

fn config_params(config: &BotConfig) -> libsql::params::Params {
    libsql::params::Params::Positional(vec![
        CONFIG_ROW_ID.into(),
        i64::from(config.auto_respond).into(),
        i64::from(config.require_approval).into(),
        i64::try_from(config.response_delay_ms)
            .unwrap_or(i64::MAX)
            .into(),
        i64::from(config.max_tokens).into(),
        config.system_prompt.clone().into(),
        config.fallback_message.clone().into(),
        format_datetime(config.updated_at).into(),
    ])
}

fn parse_id<T: FromStr>(s: &str, what: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::InvalidData(format!("invalid {}: {}", what, s)))
}

/// Format a datetime for storage.
///
/// Fixed microsecond precision keeps lexical order equal to time order.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime from storage.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidData(format!("invalid datetime: {}", s)))
}
