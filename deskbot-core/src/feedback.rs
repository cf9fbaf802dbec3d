//! Reaction feedback and satisfaction metrics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::storage::Store;
use crate::types::{FeedbackId, ResponseId, TicketId, now};

/// Emoji that marks a response as helpful.
pub const POSITIVE_EMOJI: &str = "👍";
/// Emoji that marks a response as unhelpful.
pub const NEGATIVE_EMOJI: &str = "👎";

/// Ratings at or above this count as satisfied.
const SATISFIED_RATING: u8 = 4;

/// Direction of a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Map a reaction emoji; anything other than thumbs up/down is not feedback.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            POSITIVE_EMOJI => Some(Self::Positive),
            NEGATIVE_EMOJI => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn rating(&self) -> u8 {
        match self {
            Self::Positive => 5,
            Self::Negative => 1,
        }
    }
}

/// One observed reaction on a delivered response. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub response_id: ResponseId,
    pub ticket_id: TicketId,
    pub user_id: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn is_positive(&self) -> bool {
        self.rating >= SATISFIED_RATING
    }
}

/// Percentage of satisfied ratings, rounded to one decimal. `0` when empty.
pub fn satisfaction_rate(feedback: &[Feedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let positive = feedback.iter().filter(|f| f.is_positive()).count() as f64;
    let rate = positive / feedback.len() as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Records reactions against the responses they were left on.
#[derive(Clone)]
pub struct FeedbackAggregator {
    store: Arc<dyn Store>,
}

impl FeedbackAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a feedback row for the response delivered as `message_id`.
    ///
    /// Returns `None` when the message is not a tracked response. Repeat
    /// reactions from the same user are recorded again.
    #[instrument(skip(self), level = "debug")]
    pub async fn record_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        polarity: Polarity,
    ) -> Result<Option<Feedback>> {
        let Some(response) = self.store.find_response_by_message_id(message_id).await? else {
            debug!(message_id, "reaction on untracked message");
            return Ok(None);
        };

        let feedback = Feedback {
            id: FeedbackId::new(),
            response_id: response.id,
            ticket_id: response.ticket_id,
            user_id: user_id.to_string(),
            rating: polarity.rating(),
            created_at: now(),
        };
        self.store.create_feedback(&feedback).await?;
        info!(response_id = %response.id, rating = feedback.rating, "feedback recorded");
        Ok(Some(feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TursoStore;
    use crate::ticket::{BotResponse, ResponseStatus};

    fn rated(rating: u8) -> Feedback {
        Feedback {
            id: FeedbackId::new(),
            response_id: ResponseId::new(),
            ticket_id: TicketId::new(),
            user_id: "u".into(),
            rating,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn satisfaction_of_three_in_four_is_75() {
        let feedback: Vec<_> = [5, 5, 1, 5].into_iter().map(rated).collect();
        assert_eq!(satisfaction_rate(&feedback), 75.0);
    }

    #[test]
    fn satisfaction_of_nothing_is_zero() {
        assert_eq!(satisfaction_rate(&[]), 0.0);
    }

    #[test]
    fn satisfaction_rounds_to_one_decimal() {
        let feedback: Vec<_> = [5, 1, 1].into_iter().map(rated).collect();
        assert_eq!(satisfaction_rate(&feedback), 33.3);
        let feedback: Vec<_> = [5, 5, 1].into_iter().map(rated).collect();
        assert_eq!(satisfaction_rate(&feedback), 66.7);
    }

    #[test]
    fn polarity_from_emoji() {
        assert_eq!(Polarity::from_emoji("👍"), Some(Polarity::Positive));
        assert_eq!(Polarity::from_emoji("👎"), Some(Polarity::Negative));
        assert_eq!(Polarity::from_emoji("🎉"), None);
        assert_eq!(Polarity::Positive.rating(), 5);
        assert_eq!(Polarity::Negative.rating(), 1);
    }

    async fn sent_response(store: &TursoStore, message_id: &str) -> BotResponse {
        let mut response = BotResponse::new(TicketId::new(), "hello", ResponseStatus::Approved);
        store.create_response(&response).await.unwrap();
        store
            .mark_response_sent(response.id, message_id, Utc::now())
            .await
            .unwrap();
        response.message_id = Some(message_id.to_string());
        response
    }

    #[tokio::test]
    async fn reaction_on_untracked_message_is_ignored() {
        let store = Arc::new(TursoStore::new_memory().await.unwrap());
        let aggregator = FeedbackAggregator::new(store.clone());

        let result = aggregator
            .record_reaction("unknown", "user-1", Polarity::Positive)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(store.list_feedback(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_reactions_are_all_recorded() {
        let store = Arc::new(TursoStore::new_memory().await.unwrap());
        let response = sent_response(&store, "msg-1").await;
        let aggregator = FeedbackAggregator::new(store.clone());

        aggregator
            .record_reaction("msg-1", "user-1", Polarity::Positive)
            .await
            .unwrap();
        let second = aggregator
            .record_reaction("msg-1", "user-1", Polarity::Negative)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(second.response_id, response.id);
        assert_eq!(second.ticket_id, response.ticket_id);
        let rows = store.list_feedback(Some(response.id)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(satisfaction_rate(&rows), 50.0);
    }
}
