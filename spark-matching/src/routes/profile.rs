use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use spark_shared::errors::AppResult;
use spark_shared::types::auth::AuthUser;
use spark_shared::types::ApiResponse;

use super::blocking;
use crate::models::{Profile, ProfileChanges, UserWithProfile};
use crate::services::profile_service;
use crate::AppState;

pub async fn get_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserWithProfile>>> {
    let me = blocking(&state, move |db| profile_service::get_user(db, user.id)).await?;
    Ok(Json(ApiResponse::ok(me)))
}

pub async fn onboard(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = blocking(&state, move |db| profile_service::onboard(db, user.id, changes)).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = blocking(&state, move |db| profile_service::get_profile(db, user.id)).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = blocking(&state, move |db| profile_service::update_profile(db, user.id, changes)).await?;
    Ok(Json(ApiResponse::ok(profile)))
}
