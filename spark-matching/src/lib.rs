pub mod config;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use spark_shared::clients::rabbitmq::RabbitMQClient;

use crate::config::AppConfig;
use crate::store::Database;

pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub rabbitmq: Option<RabbitMQClient>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config, rabbitmq: None, metrics_handle: None }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profile
        .route("/users/me", get(routes::profile::get_me))
        .route("/users/me/onboard", post(routes::profile::onboard))
        .route(
            "/users/me/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        // Discovery + swipes
        .route("/discovery", get(routes::discovery::get_discovery))
        .route("/swipes", post(routes::swipes::record_swipe))
        // Matches + conversations
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:id", delete(routes::matches::unmatch))
        .route(
            "/matches/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .route("/matches/:id/read", post(routes::messages::mark_read))
        // Safety
        .route("/blocks", post(routes::safety::create_block))
        .route("/reports", post(routes::safety::create_report))
        .with_state(state)
}
