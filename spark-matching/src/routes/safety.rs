use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::ApiResponse;

use super::blocking;
use crate::events::publisher;
use crate::models::{Block, Report};
use crate::services::safety_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub blocked_id: Uuid,
}

pub async fn create_block(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlockRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Block>>)> {
    let outcome = blocking(&state, move |db| safety_service::create_block(db, user.id, req.blocked_id)).await?;

    let rabbitmq = state.rabbitmq.as_ref();
    if outcome.created {
        publisher::publish_block_created(rabbitmq, &outcome.block).await;
    }
    if let Some(m) = &outcome.removed_match {
        publisher::publish_match_removed(rabbitmq, m, user.id, "block").await;
    }

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ApiResponse::ok(outcome.block))))
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub reported_id: Uuid,
    pub reason: String,
}

pub async fn create_report(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Report>>)> {
    let report = blocking(&state, move |db| {
        safety_service::create_report(db, user.id, req.reported_id, &req.reason)
    })
    .await?;

    publisher::publish_report_created(state.rabbitmq.as_ref(), &report).await;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(report))))
}
