use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use spark_shared::{HealthCheck, HealthResponse, HealthStatus};

use super::blocking;
use crate::AppState;

/// Liveness plus a store round-trip. Missing broker is reported, not failed.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let store = match blocking(&state, |db| db.ping()).await {
        Ok(()) => HealthCheck {
            name: format!("store:{}", state.db.backend_name()),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => HealthCheck {
            name: format!("store:{}", state.db.backend_name()),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let events = HealthCheck {
        name: "events".into(),
        status: if state.rabbitmq.is_some() { HealthStatus::Healthy } else { HealthStatus::Degraded },
        message: state.rabbitmq.is_none().then(|| "no broker configured".to_string()),
    };

    let response = HealthResponse::healthy("spark-matching", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![store, events]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
