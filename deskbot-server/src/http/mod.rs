//! HTTP server module

mod api;
mod channels;
mod knowledge;
mod tickets;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::error::ApiError;

pub use api::HealthResponse;
pub use channels::{PauseRequest, ResumeResponse};
pub use knowledge::{BackfillResponse, SearchQuery};
pub use tickets::{FeedbackQuery, ResponseQuery, TicketDetail, TicketQuery};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/stats", get(api::stats))
        .route("/api/config", get(api::get_config).patch(api::update_config))
        .route("/api/events", post(api::dispatch_event))
        .route(
            "/api/knowledge",
            get(knowledge::list_knowledge).post(knowledge::create_knowledge),
        )
        .route("/api/knowledge/search", get(knowledge::search_knowledge))
        .route("/api/knowledge/backfill", post(knowledge::backfill_knowledge))
        .route("/api/knowledge/:id", delete(knowledge::delete_knowledge))
        .route("/api/tickets", get(tickets::list_tickets))
        .route("/api/tickets/:id", get(tickets::get_ticket))
        .route("/api/bot-responses", get(tickets::list_responses))
        .route("/api/bot-responses/pending", get(tickets::list_pending))
        .route("/api/bot-responses/undelivered", get(tickets::list_undelivered))
        .route("/api/bot-responses/:id/approve", post(tickets::approve_response))
        .route("/api/bot-responses/:id/reject", post(tickets::reject_response))
        .route("/api/feedback", get(tickets::list_feedback))
        .route(
            "/api/channels/paused",
            get(channels::list_paused).post(channels::pause_channel),
        )
        .route("/api/channels/paused/:channel_id", delete(channels::resume_channel))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse a path or query id into one of the record id types.
fn parse_id<T: std::str::FromStr>(raw: &str, kind: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {kind} id: {raw}")))
}
