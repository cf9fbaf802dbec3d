//! Aggregate counters for dashboards and the `stats` command.

use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::feedback::satisfaction_rate;
use crate::storage::Store;
use crate::ticket::{ResponseStatus, TicketStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub responded_tickets: usize,
    pub closed_tickets: usize,
    pub total_responses: usize,
    pub sent_responses: usize,
    pub pending_responses: usize,
    /// `approved` responses that never reached the transport.
    pub undelivered_responses: usize,
    pub total_feedback: usize,
    pub positive_feedback: usize,
    /// Percentage, one decimal.
    pub satisfaction_rate: f64,
    pub knowledge_entries: usize,
}

impl DashboardStats {
    #[instrument(skip_all, level = "debug")]
    pub async fn collect(store: &dyn Store) -> Result<Self> {
        let tickets = store.list_tickets(None).await?;
        let responses = store.list_responses(None).await?;
        let feedback = store.list_feedback(None).await?;
        let knowledge = store.list_knowledge().await?;

        let tickets_in = |status: TicketStatus| tickets.iter().filter(|t| t.status == status).count();
        let responses_in = |status: ResponseStatus| responses.iter().filter(|r| r.status == status).count();

        Ok(Self {
            total_tickets: tickets.len(),
            open_tickets: tickets_in(TicketStatus::Open),
            responded_tickets: tickets_in(TicketStatus::Responded),
            closed_tickets: tickets_in(TicketStatus::Closed),
            total_responses: responses.len(),
            sent_responses: responses_in(ResponseStatus::Sent),
            pending_responses: responses_in(ResponseStatus::Pending),
            undelivered_responses: responses.iter().filter(|r| r.is_undelivered()).count(),
            total_feedback: feedback.len(),
            positive_feedback: feedback.iter().filter(|f| f.is_positive()).count(),
            satisfaction_rate: satisfaction_rate(&feedback),
            knowledge_entries: knowledge.len(),
        })
    }
}
