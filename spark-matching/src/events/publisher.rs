//! Best-effort domain events. Every function is a no-op without a broker
//! connection and only logs publish failures; the write they describe has
//! already committed.

use serde::Serialize;
use uuid::Uuid;

use spark_shared::clients::rabbitmq::RabbitMQClient;
use spark_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{Block, Match, Message, Report};

const SOURCE: &str = "spark-matching";
const PREVIEW_CHARS: usize = 80;

async fn publish<T: Serialize>(
    rabbitmq: Option<&RabbitMQClient>,
    routing_key: &'static str,
    user_id: Uuid,
    data: T,
) {
    let Some(rabbitmq) = rabbitmq else {
        tracing::trace!(routing_key, "no broker configured, event skipped");
        return;
    };

    let event = Event::new(SOURCE, routing_key, data).with_user(user_id);
    if let Err(e) = rabbitmq.publish(routing_key, &event).await {
        tracing::error!(error = %e, routing_key, "failed to publish event");
    }
}

pub async fn publish_swipe_recorded(rabbitmq: Option<&RabbitMQClient>, actor_id: Uuid, target_id: Uuid, liked: bool) {
    publish(
        rabbitmq,
        routing_keys::MATCHING_SWIPE_RECORDED,
        actor_id,
        payloads::SwipeRecorded { actor_id, target_id, liked },
    )
    .await;
}

pub async fn publish_match_created(rabbitmq: Option<&RabbitMQClient>, m: &Match) {
    publish(
        rabbitmq,
        routing_keys::MATCHING_MATCH_CREATED,
        m.user_a_id,
        payloads::MatchCreated {
            match_id: m.id,
            user_a_id: m.user_a_id,
            user_b_id: m.user_b_id,
        },
    )
    .await;
}

pub async fn publish_match_removed(rabbitmq: Option<&RabbitMQClient>, m: &Match, removed_by: Uuid, reason: &str) {
    publish(
        rabbitmq,
        routing_keys::MATCHING_MATCH_REMOVED,
        removed_by,
        payloads::MatchRemoved {
            match_id: m.id,
            user_a_id: m.user_a_id,
            user_b_id: m.user_b_id,
            reason: reason.to_string(),
        },
    )
    .await;
}

pub async fn publish_message_sent(rabbitmq: Option<&RabbitMQClient>, message: &Message, recipient_id: Uuid) {
    publish(
        rabbitmq,
        routing_keys::MESSAGING_MESSAGE_SENT,
        message.sender_id,
        payloads::MessageSent {
            message_id: message.id,
            match_id: message.match_id,
            sender_id: message.sender_id,
            recipient_id,
            content_preview: message.text.chars().take(PREVIEW_CHARS).collect(),
        },
    )
    .await;
}

pub async fn publish_block_created(rabbitmq: Option<&RabbitMQClient>, block: &Block) {
    publish(
        rabbitmq,
        routing_keys::SAFETY_BLOCK_CREATED,
        block.blocker_id,
        payloads::BlockCreated {
            blocker_id: block.blocker_id,
            blocked_id: block.blocked_id,
        },
    )
    .await;
}

pub async fn publish_report_created(rabbitmq: Option<&RabbitMQClient>, report: &Report) {
    publish(
        rabbitmq,
        routing_keys::SAFETY_REPORT_CREATED,
        report.reporter_id,
        payloads::ReportCreated {
            report_id: report.id,
            reporter_id: report.reporter_id,
            reported_id: report.reported_id,
        },
    )
    .await;
}
