//! Per-channel pause gate

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use deskbot_core::{Error, PausedChannel};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct PauseRequest {
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub channel_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeResponse {
    /// `false` when the channel was not paused
    pub resumed: bool,
}

/// GET /api/channels/paused
pub async fn list_paused(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PausedChannel>>> {
    Ok(Json(state.store.list_paused_channels().await?))
}

/// POST /api/channels/paused - idempotent, returns the existing record
pub async fn pause_channel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PauseRequest>,
) -> ApiResult<Json<PausedChannel>> {
    if request.channel_id.trim().is_empty() {
        return Err(Error::Validation("channel_id must not be blank".into()).into());
    }
    let paused = state
        .lifecycle
        .pause(&request.channel_id, &request.guild_id, &request.channel_name)
        .await?;
    Ok(Json(paused))
}

/// DELETE /api/channels/paused/:channel_id
pub async fn resume_channel(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<ResumeResponse>> {
    let resumed = state.lifecycle.resume(&channel_id).await?;
    Ok(Json(ResumeResponse { resumed }))
}
