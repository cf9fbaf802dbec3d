//! Ticket and response lifecycle.
//!
//! ```text
//! inbound message ─▶ pause gate ─▶ Ticket(open) ─▶ classify ─▶ compose
//!                                                                 │
//!                       require_approval ─▶ Response(pending) ◀───┤
//!                                              │ approve          │
//!                                              ▼                  │
//!                                        Response(approved) ◀─────┘
//!                                              │ deliver
//!                                              ▼
//!                           Response(sent) + Ticket(responded)
//! ```
//!
//! All state lives in the [`Store`]; transitions are compare-and-set there.
//! A response is claimed in-process while it is being delivered so that
//! two approvals of the same response cannot both send it.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use deskbot_models::{CompletionProvider, EmbeddingProvider};
use futures_util::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::channel::PausedChannel;
use crate::compose::ResponseComposer;
use crate::config::BotConfig;
use crate::delivery::{DeliverySink, truncate_for_transport};
use crate::error::{DeliveryError, Error, Result};
use crate::events::InboundMessage;
use crate::feedback::{NEGATIVE_EMOJI, POSITIVE_EMOJI};
use crate::retrieval::KnowledgeIndex;
use crate::sentiment::{Classification, SentimentClassifier};
use crate::storage::{self, Store};
use crate::ticket::{BotResponse, ResponseStatus, Ticket, TicketStatus};
use crate::types::{ResponseId, TicketId, now};

/// Why an inbound message produced no ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AutoRespondDisabled,
    AutomatedAuthor,
    ChannelPaused,
}

/// Result of handing a response to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum Delivery {
    Sent { response: BotResponse },
    /// The response keeps its pre-delivery status.
    Failed { response: BotResponse, reason: String },
}

impl Delivery {
    pub fn response(&self) -> &BotResponse {
        match self {
            Self::Sent { response } | Self::Failed { response, .. } => response,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Result of ingesting one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Skipped {
        reason: SkipReason,
    },
    AwaitingApproval {
        ticket: Ticket,
        response: BotResponse,
    },
    Answered {
        ticket: Ticket,
        delivery: Delivery,
    },
}

/// Drives tickets and responses through their states.
pub struct TicketLifecycle {
    store: Arc<dyn Store>,
    classifier: SentimentClassifier,
    composer: ResponseComposer,
    sink: Arc<dyn DeliverySink>,
    in_flight: Mutex<HashSet<ResponseId>>,
}

/// Marks a response as being delivered until dropped.
struct DeliveryClaim<'a> {
    in_flight: &'a Mutex<HashSet<ResponseId>>,
    id: ResponseId,
}

impl Drop for DeliveryClaim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl TicketLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        Self {
            store,
            classifier: SentimentClassifier::new(completer.clone()),
            composer: ResponseComposer::new(KnowledgeIndex::new(embedder), completer),
            sink,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn claim(&self, id: ResponseId) -> Option<DeliveryClaim<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.insert(id).then(|| DeliveryClaim {
            in_flight: &self.in_flight,
            id,
        })
    }

    /// Turn an inbound message into a ticket and a response.
    ///
    /// A no-op when auto-respond is off, the author is automated, the
    /// message is blank, or the channel is paused.
    #[instrument(skip(self, message), fields(channel_id = %message.channel_id), level = "debug")]
    pub async fn ingest(&self, message: &InboundMessage) -> Result<IngestOutcome> {
        let config = self.store.get_config().await?;

        let skip = if !config.auto_respond {
            Some(SkipReason::AutoRespondDisabled)
        } else if message.is_bot {
            Some(SkipReason::AutomatedAuthor)
        } else if self.store.is_channel_paused(&message.channel_id).await? {
            Some(SkipReason::ChannelPaused)
        } else {
            None
        };
        if let Some(reason) = skip {
            debug!(?reason, "message skipped");
            return Ok(IngestOutcome::Skipped { reason });
        }

        let mut ticket = Ticket {
            id: TicketId::new(),
            channel_id: message.channel_id.clone(),
            channel_name: message.channel_name.clone(),
            user_id: message.user_id.clone(),
            username: message.username.clone(),
            content: message.content.clone(),
            sentiment: None,
            urgency: None,
            status: TicketStatus::Open,
            created_at: now(),
        };
        self.store.create_ticket(&ticket).await?;
        info!(ticket_id = %ticket.id, "ticket opened");

        let classification = AssertUnwindSafe(self.classifier.classify(&message.content))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(ticket_id = %ticket.id, "sentiment classification panicked");
                Classification::default()
            });
        match self
            .store
            .update_ticket_sentiment(ticket.id, classification.sentiment, classification.urgency)
            .await
        {
            Ok(_) => {
                ticket.sentiment = Some(classification.sentiment);
                ticket.urgency = Some(classification.urgency);
            }
            Err(e) => warn!(ticket_id = %ticket.id, error = %e, "failed to record sentiment"),
        }

        let corpus = self.store.list_knowledge().await?;
        let content = self.composer.compose(&message.content, &corpus, &config).await;

        let status = if config.require_approval {
            ResponseStatus::Pending
        } else {
            ResponseStatus::Approved
        };
        let response = BotResponse::new(ticket.id, content, status);
        let claim = self.claim(response.id);
        self.store.create_response(&response).await?;

        if config.require_approval {
            info!(ticket_id = %ticket.id, response_id = %response.id, "response awaiting approval");
            return Ok(IngestOutcome::AwaitingApproval { ticket, response });
        }

        let delivery = self.deliver_claimed(response, &ticket, &config).await;
        drop(claim);
        if delivery.is_sent() && ticket.status == TicketStatus::Open {
            ticket.status = TicketStatus::Responded;
        }
        Ok(IngestOutcome::Answered { ticket, delivery })
    }

    /// Deliver an `approved` response.
    ///
    /// Delivery failures do not surface as errors: they come back as
    /// [`Delivery::Failed`] with the response still `approved`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the response is not `approved`,
    /// `DeliveryInFlight` if it is already being delivered.
    #[instrument(skip_all, fields(response_id = %response.id), level = "debug")]
    pub async fn deliver(
        &self,
        response: BotResponse,
        ticket: &Ticket,
        config: &BotConfig,
    ) -> Result<Delivery> {
        let _claim = self
            .claim(response.id)
            .ok_or_else(|| Error::DeliveryInFlight(response.id.to_string()))?;
        if response.status != ResponseStatus::Approved {
            return Err(Error::transition(response.status, ResponseStatus::Sent));
        }
        Ok(self.deliver_claimed(response, ticket, config).await)
    }

    async fn deliver_claimed(
        &self,
        response: BotResponse,
        ticket: &Ticket,
        config: &BotConfig,
    ) -> Delivery {
        if config.response_delay_ms > 0 {
            tokio::time::sleep(config.response_delay()).await;
        }

        let content = truncate_for_transport(&response.content, self.sink.message_limit());
        match self.send_and_record(&response, ticket, &content).await {
            Ok(sent) => {
                info!(response_id = %sent.id, ticket_id = %ticket.id, "response delivered");
                Delivery::Sent { response: sent }
            }
            Err(e) => {
                error!(response_id = %response.id, ticket_id = %ticket.id, error = %e, "delivery failed");
                Delivery::Failed {
                    response,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn send_and_record(
        &self,
        response: &BotResponse,
        ticket: &Ticket,
        content: &str,
    ) -> std::result::Result<BotResponse, DeliveryError> {
        let message_id = self.sink.send(&ticket.channel_id, content).await?;

        let sent_at = now();
        if !self
            .store
            .mark_response_sent(response.id, &message_id, sent_at)
            .await?
        {
            return Err(DeliveryError::Record(storage::Error::InvalidData(format!(
                "response {} is no longer approved; sent as message {}",
                response.id, message_id
            ))));
        }

        // Closed tickets stay closed
        if let Err(e) = self
            .store
            .transition_ticket(ticket.id, TicketStatus::Open, TicketStatus::Responded)
            .await
        {
            warn!(ticket_id = %ticket.id, error = %e, "failed to mark ticket responded");
        }

        if let Err(e) = self
            .sink
            .react_two_way(&message_id, POSITIVE_EMOJI, NEGATIVE_EMOJI)
            .await
        {
            warn!(%message_id, error = %e, "failed to add feedback reactions");
        }

        Ok(BotResponse {
            status: ResponseStatus::Sent,
            message_id: Some(message_id),
            sent_at: Some(sent_at),
            ..response.clone()
        })
    }

    /// Approve a response and deliver it.
    ///
    /// Accepts `pending` responses and `approved` ones whose earlier
    /// delivery failed.
    #[instrument(skip(self), level = "debug")]
    pub async fn approve(&self, id: ResponseId) -> Result<Delivery> {
        let _claim = self
            .claim(id)
            .ok_or_else(|| Error::DeliveryInFlight(id.to_string()))?;

        let mut response = self.load_response(id).await?;
        let ticket = self
            .store
            .get_ticket(response.ticket_id)
            .await?
            .ok_or_else(|| Error::not_found("Ticket", response.ticket_id))?;

        match response.status {
            ResponseStatus::Sent | ResponseStatus::Rejected => {
                return Err(Error::transition(response.status, ResponseStatus::Approved));
            }
            ResponseStatus::Pending => {
                self.transition(&mut response, ResponseStatus::Approved).await?;
                info!(response_id = %id, "response approved");
            }
            ResponseStatus::Approved => {
                info!(response_id = %id, "retrying delivery of approved response");
            }
        }

        let config = self.store.get_config().await?;
        Ok(self.deliver_claimed(response, &ticket, &config).await)
    }

    /// Reject a response. Rejecting twice is a no-op.
    #[instrument(skip(self), level = "debug")]
    pub async fn reject(&self, id: ResponseId) -> Result<BotResponse> {
        let _claim = self
            .claim(id)
            .ok_or_else(|| Error::DeliveryInFlight(id.to_string()))?;

        let mut response = self.load_response(id).await?;
        match response.status {
            ResponseStatus::Sent => Err(Error::transition(
                ResponseStatus::Sent,
                ResponseStatus::Rejected,
            )),
            ResponseStatus::Rejected => Ok(response),
            ResponseStatus::Pending | ResponseStatus::Approved => {
                self.transition(&mut response, ResponseStatus::Rejected).await?;
                info!(response_id = %id, "response rejected");
                Ok(response)
            }
        }
    }

    async fn load_response(&self, id: ResponseId) -> Result<BotResponse> {
        self.store
            .get_response(id)
            .await?
            .ok_or_else(|| Error::not_found("Response", id))
    }

    /// Compare-and-set `response` to `to`, reporting the status that won
    /// if another writer got there first.
    async fn transition(&self, response: &mut BotResponse, to: ResponseStatus) -> Result<()> {
        if self
            .store
            .transition_response(response.id, response.status, to)
            .await?
        {
            response.status = to;
            return Ok(());
        }
        let current = self.load_response(response.id).await?;
        Err(Error::transition(current.status, to))
    }

    /// Suppress automated responses in a channel. Idempotent.
    #[instrument(skip(self), level = "debug")]
    pub async fn pause(
        &self,
        channel_id: &str,
        guild_id: &str,
        channel_name: &str,
    ) -> Result<PausedChannel> {
        let paused = self
            .store
            .pause_channel(&PausedChannel::new(channel_id, guild_id, channel_name))
            .await?;
        info!(channel_id, channel_name = %paused.channel_name, "channel paused");
        Ok(paused)
    }

    /// Re-enable automated responses. Returns `false` if it was not paused.
    #[instrument(skip(self), level = "debug")]
    pub async fn resume(&self, channel_id: &str) -> Result<bool> {
        let resumed = self.store.resume_channel(channel_id).await?;
        info!(channel_id, resumed, "channel resumed");
        Ok(resumed)
    }

    /// Approved responses that were never recorded as delivered.
    pub async fn undelivered(&self) -> Result<Vec<BotResponse>> {
        Ok(self.store.list_undelivered_responses().await?)
    }
}
