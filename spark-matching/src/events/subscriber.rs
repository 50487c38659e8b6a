use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;
use std::sync::Arc;

use spark_shared::clients::rabbitmq::RabbitMQClient;
use spark_shared::types::event::{payloads, routing_keys, Event};

use crate::services::profile_service;
use crate::AppState;

const USER_REGISTERED_QUEUE: &str = "spark-matching.auth.user.registered";

/// Mirror identity-service registrations into the local users table.
pub async fn listen_user_registered(state: Arc<AppState>, rabbitmq: RabbitMQClient) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(USER_REGISTERED_QUEUE, &[routing_keys::AUTH_USER_REGISTERED])
        .await?;

    tracing::info!("listening for auth.user.registered events");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
                continue;
            }
        };

        match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
            Ok(event) => {
                let db = state.db.clone();
                let data = event.data;
                let user_id = data.user_id;

                let result = tokio::task::spawn_blocking(move || profile_service::register_user(&db, &data)).await;
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, user_id = %user_id, "failed to register user"),
                    Err(e) => tracing::error!(error = %e, user_id = %user_id, "register task panicked"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize user.registered event");
            }
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            tracing::warn!(error = %e, "failed to ack delivery");
        }
    }

    Ok(())
}
