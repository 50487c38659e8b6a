use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `spark.{domain}.{entity}.{action}`
/// Example: `spark.matching.match.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Identity events (consumed)
    pub const AUTH_USER_REGISTERED: &str = "spark.auth.user.registered";

    // Matching events
    pub const MATCHING_SWIPE_RECORDED: &str = "spark.matching.swipe.recorded";
    pub const MATCHING_MATCH_CREATED: &str = "spark.matching.match.created";
    pub const MATCHING_MATCH_REMOVED: &str = "spark.matching.match.removed";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "spark.messaging.message.sent";

    // Safety events
    pub const SAFETY_BLOCK_CREATED: &str = "spark.safety.block.created";
    pub const SAFETY_REPORT_CREATED: &str = "spark.safety.report.created";
}

/// Event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub user_id: Uuid,
        #[serde(default)]
        pub is_admin: bool,
        #[serde(default)]
        pub is_verified: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SwipeRecorded {
        pub actor_id: Uuid,
        pub target_id: Uuid,
        pub liked: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchRemoved {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        /// `unmatch` or `block`
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: Uuid,
        pub match_id: Uuid,
        pub sender_id: Uuid,
        pub recipient_id: Uuid,
        pub content_preview: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockCreated {
        pub blocker_id: Uuid,
        pub blocked_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub reporter_id: Uuid,
        pub reported_id: Uuid,
    }
}
