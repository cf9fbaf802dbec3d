//! Health, statistics, operator config and inbound events

use std::sync::Arc;

use axum::{Json, extract::State};
use deskbot_core::{BotConfig, BotConfigUpdate, DashboardStats, DispatchOutcome, InboundEvent};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(DashboardStats::collect(state.store.as_ref()).await?))
}

/// GET /api/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<Json<BotConfig>> {
    Ok(Json(state.store.get_config().await?))
}

/// PATCH /api/config - partial update, absent fields unchanged
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<BotConfigUpdate>,
) -> ApiResult<Json<BotConfig>> {
    let mut config = state.store.get_config().await?;
    update.apply_to(&mut config)?;
    state.store.save_config(&config).await?;
    info!(
        auto_respond = config.auto_respond,
        require_approval = config.require_approval,
        "bot config updated"
    );
    Ok(Json(config))
}

/// POST /api/events - platform adapters post inbound events here
pub async fn dispatch_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InboundEvent>,
) -> ApiResult<Json<DispatchOutcome>> {
    Ok(Json(state.dispatcher.dispatch(event).await?))
}
