use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::ApiResponse;

use super::blocking;
use crate::events::publisher;
use crate::models::SwipeOutcome;
use crate::services::matching_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub target_id: Uuid,
    pub is_like: bool,
}

pub async fn record_swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let SwipeRequest { target_id, is_like } = req;
    let result = blocking(&state, move |db| {
        matching_service::record_swipe(db, user.id, target_id, is_like)
    })
    .await?;

    let rabbitmq = state.rabbitmq.as_ref();
    if result.outcome.recorded {
        publisher::publish_swipe_recorded(rabbitmq, user.id, target_id, is_like).await;
    }
    if let Some(m) = &result.created_match {
        publisher::publish_match_created(rabbitmq, m).await;
    }

    Ok(Json(ApiResponse::ok(result.outcome)))
}
