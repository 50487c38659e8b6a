use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::{ApiResponse, LimitParams};

use super::blocking;
use crate::events::publisher;
use crate::models::Message;
use crate::services::conversation_service::{self, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT};
use crate::AppState;

/// GET /matches/:id/messages?limit= - participants only
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let limit = params.resolve(DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT);

    let messages = blocking(&state, move |db| {
        conversation_service::get_match(db, match_id, user.id)?;
        conversation_service::list_messages(db, match_id, limit)
    })
    .await?;

    Ok(Json(ApiResponse::ok(messages)))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let sent = blocking(&state, move |db| {
        conversation_service::send_message(db, user.id, match_id, &req.text)
    })
    .await?;

    publisher::publish_message_sent(state.rabbitmq.as_ref(), &sent.message, sent.recipient_id).await;

    Ok(Json(ApiResponse::ok(sent.message)))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    let updated = blocking(&state, move |db| conversation_service::mark_read(db, match_id, user.id)).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}
