//! deskbot-core: support-ticket assistant engine
//!
//! This crate provides the components between an inbound chat message and a
//! delivered, rated reply:
//!
//! - **Knowledge** - [`KnowledgeEntry`] corpus management and the
//!   [`KnowledgeIndex`] that ranks it against a query
//! - **Composition** - [`ResponseComposer`] with its three-tier fallback
//! - **Classification** - [`SentimentClassifier`]
//! - **Lifecycle** - [`TicketLifecycle`], the ticket/response state machine
//!   with the per-channel pause gate
//! - **Feedback** - [`FeedbackAggregator`] and satisfaction metrics
//! - **Events** - [`Dispatcher`] for platform events
//! - **Storage** - the [`Store`] trait and its libSQL implementation
//! - **Delivery** - the [`DeliverySink`] transport seam
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use deskbot_core::{DisabledSink, InboundMessage, TicketLifecycle, TursoStore};
//! use deskbot_models::OllamaProvider;
//!
//! async fn example() -> deskbot_core::Result<()> {
//!     let store = Arc::new(TursoStore::new_memory().await?);
//!     let ollama = Arc::new(OllamaProvider::new());
//!     let lifecycle = TicketLifecycle::new(store, ollama.clone(), ollama, Arc::new(DisabledSink));
//!
//!     let outcome = lifecycle
//!         .ingest(&InboundMessage {
//!             channel_id: "c1".into(),
//!             guild_id: "g1".into(),
//!             channel_name: "suporte".into(),
//!             user_id: "u1".into(),
//!             username: "ana".into(),
//!             is_bot: false,
//!             content: "Qual o prazo de reembolso?".into(),
//!         })
//!         .await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!  InboundEvent ──▶ Dispatcher ──┬──▶ TicketLifecycle ──┬──▶ SentimentClassifier
//!                                │                      ├──▶ ResponseComposer
//!                                │                      │      └─ KnowledgeIndex
//!                                │                      └──▶ DeliverySink
//!                                └──▶ FeedbackAggregator
//!
//!  every component persists through Store (libSQL)
//! ```

pub mod channel;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod error;
pub mod events;
pub mod feedback;
pub mod knowledge;
pub mod lifecycle;
pub mod retrieval;
pub mod sentiment;
pub mod stats;
pub mod storage;
pub mod testing;
pub mod ticket;
pub mod types;

// Re-export key types for convenience
pub use channel::PausedChannel;
pub use compose::ResponseComposer;
pub use config::{BotConfig, BotConfigUpdate};
pub use delivery::{DeliverySink, DisabledSink, WebhookSink};
pub use error::{DeliveryError, Error, Result};
pub use events::{DispatchOutcome, Dispatcher, InboundEvent, InboundMessage};
pub use feedback::{Feedback, FeedbackAggregator, Polarity};
pub use knowledge::{KnowledgeEntry, NewKnowledgeEntry};
pub use lifecycle::{Delivery, IngestOutcome, SkipReason, TicketLifecycle};
pub use retrieval::{KnowledgeIndex, RankedEntry, Retrieval};
pub use sentiment::{Classification, SentimentClassifier};
pub use stats::DashboardStats;
pub use storage::{Store, TursoStore};
pub use ticket::{BotResponse, ResponseStatus, Sentiment, Ticket, TicketStatus, Urgency};
pub use types::{FeedbackId, KnowledgeId, PausedChannelId, ResponseId, TicketId};
