//! Knowledge corpus handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use deskbot_core::knowledge::{add_entry, backfill_embeddings, delete_entry};
use deskbot_core::{KnowledgeEntry, KnowledgeId, NewKnowledgeEntry, RankedEntry};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackfillResponse {
    /// Entries that received an embedding
    pub filled: usize,
}

/// GET /api/knowledge - oldest first
pub async fn list_knowledge(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<KnowledgeEntry>>> {
    Ok(Json(state.store.list_knowledge().await?))
}

/// POST /api/knowledge
pub async fn create_knowledge(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewKnowledgeEntry>,
) -> ApiResult<(StatusCode, Json<KnowledgeEntry>)> {
    let entry = add_entry(state.store.as_ref(), state.embedder.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/knowledge/:id
pub async fn delete_knowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: KnowledgeId = parse_id(&id, "knowledge")?;
    delete_entry(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/knowledge/backfill
pub async fn backfill_knowledge(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BackfillResponse>> {
    let filled = backfill_embeddings(state.store.as_ref(), state.embedder.as_ref()).await?;
    Ok(Json(BackfillResponse { filled }))
}

/// GET /api/knowledge/search?q= - entries above the general similarity threshold
pub async fn search_knowledge(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<RankedEntry>>> {
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be blank"));
    }
    let corpus = state.store.list_knowledge().await?;
    Ok(Json(state.index.similar(&query.q, &corpus).await?))
}
