use axum::http::{header, Method};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use spark_matching::config::{AppConfig, StorageKind};
use spark_matching::events::subscriber;
use spark_matching::store::{Database, MemoryStore, PgStore};
use spark_matching::{build_router, AppState};
use spark_shared::clients::{db, rabbitmq::RabbitMQClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spark_shared::middleware::init_tracing("spark-matching");

    let config = AppConfig::load()?;
    // fail at startup rather than on the first authenticated request
    spark_shared::middleware::jwt_secret()?;
    let port = config.port;

    let metrics_handle = spark_shared::middleware::init_metrics()?;

    // Storage backend
    let retry = config.retry_policy();
    let database = match config.storage {
        StorageKind::Postgres => {
            let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
            Database::postgres(PgStore::new(pool, config.statement_timeout_ms), retry)
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            Database::memory(MemoryStore::default(), retry)
        }
    };

    // Event broker is optional; the service runs without one
    let rabbitmq = match &config.rabbitmq_url {
        Some(url) => Some(RabbitMQClient::connect(url).await?),
        None => {
            tracing::warn!("no rabbitmq_url configured, domain events disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        db: database,
        config,
        rabbitmq: rabbitmq.clone(),
        metrics_handle: Some(metrics_handle),
    });

    if let Some(rabbitmq) = rabbitmq {
        let listener_state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = subscriber::listen_user_registered(listener_state, rabbitmq).await {
                tracing::error!(error = %e, "user.registered listener stopped");
            }
        });
    }

    let app = build_router(state)
        .layer(axum::middleware::from_fn(spark_shared::middleware::metrics_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(AllowMethods::list([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]))
                .allow_headers(AllowHeaders::list([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                ])),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "spark-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
