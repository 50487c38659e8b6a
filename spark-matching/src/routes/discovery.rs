use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::{ApiResponse, LimitParams};

use super::blocking;
use crate::models::Profile;
use crate::services::discovery_service::{self, DiscoveryQuery, DEFAULT_LIMIT, MAX_LIMIT};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoveryParams {
    pub limit: Option<u32>,
    pub gender: Option<String>,
}

/// GET /discovery?limit=&gender=
pub async fn get_discovery(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoveryParams>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let query = DiscoveryQuery {
        limit: LimitParams { limit: params.limit }.resolve(DEFAULT_LIMIT, MAX_LIMIT),
        gender: params.gender,
    };

    let candidates = blocking(&state, move |db| discovery_service::discover(db, user.id, &query)).await?;
    Ok(Json(ApiResponse::ok(candidates)))
}
