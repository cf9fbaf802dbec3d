//! Tickets, bot responses and feedback

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use deskbot_core::{
    BotResponse, Delivery, Error, Feedback, ResponseId, ResponseStatus, Ticket, TicketId,
};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::error::ApiResult;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TicketQuery {
    pub limit: Option<u32>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResponseQuery {
    pub ticket_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeedbackQuery {
    pub response_id: Option<String>,
}

/// A ticket with everything recorded against it
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub responses: Vec<BotResponse>,
    pub feedback: Vec<Feedback>,
}

/// GET /api/tickets?limit=&channel_id= - newest first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketQuery>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let tickets = match query.channel_id {
        Some(channel_id) => {
            let mut tickets = state.store.list_tickets_by_channel(&channel_id).await?;
            if let Some(limit) = query.limit {
                tickets.truncate(limit as usize);
            }
            tickets
        }
        None => state.store.list_tickets(query.limit).await?,
    };
    Ok(Json(tickets))
}

/// GET /api/tickets/:id
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TicketDetail>> {
    let id: TicketId = parse_id(&id, "ticket")?;
    let ticket = state
        .store
        .get_ticket(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "Ticket",
            id: id.to_string(),
        })?;
    let responses = state.store.list_responses(Some(id)).await?;

    let mut feedback = Vec::new();
    for response in &responses {
        feedback.extend(state.store.list_feedback(Some(response.id)).await?);
    }

    Ok(Json(TicketDetail {
        ticket,
        responses,
        feedback,
    }))
}

/// GET /api/bot-responses?ticket_id=
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResponseQuery>,
) -> ApiResult<Json<Vec<BotResponse>>> {
    let ticket_id = query
        .ticket_id
        .as_deref()
        .map(|raw| parse_id::<TicketId>(raw, "ticket"))
        .transpose()?;
    Ok(Json(state.store.list_responses(ticket_id).await?))
}

/// GET /api/bot-responses/pending - the approval queue
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BotResponse>>> {
    Ok(Json(
        state
            .store
            .list_responses_by_status(ResponseStatus::Pending)
            .await?,
    ))
}

/// GET /api/bot-responses/undelivered - approved but never sent
pub async fn list_undelivered(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BotResponse>>> {
    Ok(Json(state.lifecycle.undelivered().await?))
}

/// POST /api/bot-responses/:id/approve
///
/// A failed send still answers 200; the body says `"delivery": "failed"`
/// and the response stays approved for a retry.
pub async fn approve_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Delivery>> {
    let id: ResponseId = parse_id(&id, "response")?;
    Ok(Json(state.lifecycle.approve(id).await?))
}

/// POST /api/bot-responses/:id/reject
pub async fn reject_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BotResponse>> {
    let id: ResponseId = parse_id(&id, "response")?;
    Ok(Json(state.lifecycle.reject(id).await?))
}

/// GET /api/feedback?response_id=
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<Json<Vec<Feedback>>> {
    let response_id = query
        .response_id
        .as_deref()
        .map(|raw| parse_id::<ResponseId>(raw, "response"))
        .transpose()?;
    Ok(Json(state.store.list_feedback(response_id).await?))
}
