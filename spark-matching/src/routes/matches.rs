use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::ApiResponse;

use super::blocking;
use crate::events::publisher;
use crate::models::MatchSummary;
use crate::services::{conversation_service, safety_service};
use crate::AppState;

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let matches = blocking(&state, move |db| conversation_service::list_matches(db, user.id)).await?;
    Ok(Json(ApiResponse::ok(matches)))
}

#[derive(Debug, Serialize)]
pub struct UnmatchResponse {
    pub removed: bool,
}

/// DELETE /matches/:id - a no-op for non-participants and unknown matches
pub async fn unmatch(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UnmatchResponse>>> {
    let removed = blocking(&state, move |db| safety_service::unmatch(db, match_id, user.id)).await?;

    if let Some(m) = &removed {
        publisher::publish_match_removed(state.rabbitmq.as_ref(), m, user.id, "unmatch").await;
    }

    Ok(Json(ApiResponse::ok(UnmatchResponse { removed: removed.is_some() })))
}
