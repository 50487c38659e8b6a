use chrono::Utc;
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, MatchPartner, MatchSummary, Message};
use crate::store::{Database, StoreTx};

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;
pub const MAX_MESSAGE_LIMIT: u32 = 200;

/// A sent message together with the match it was sent in.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub recipient_id: Uuid,
}

/// Live matches of `user_id`, most recently active first. Matches with a
/// block between the participants are hidden, as are partners without a
/// user record.
pub fn list_matches(db: &Database, user_id: Uuid) -> AppResult<Vec<MatchSummary>> {
    let mut summaries = db.transaction("list_matches", |tx| {
        let mut out = Vec::new();
        for m in tx.matches_for_user(user_id)? {
            let Some(other_id) = m.other_participant(user_id) else { continue };
            if tx.block_exists_between(m.pair())? {
                continue;
            }
            let Some(other) = tx.find_user(other_id)? else {
                tracing::warn!(match_id = %m.id, user_id = %other_id, "match partner has no user record");
                continue;
            };

            out.push(MatchSummary {
                match_id: m.id,
                user: MatchPartner {
                    id: other.id,
                    is_verified: other.is_verified,
                    profile: tx.find_profile(other_id)?,
                },
                last_message: tx.last_message(m.id)?,
                unread_count: tx.count_unread(m.id, other_id)?,
                last_activity_at: m.last_activity_at,
            });
        }
        Ok(out)
    })?;

    summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
    Ok(summaries)
}

/// The match, provided `user_id` takes part in it.
pub fn get_match(db: &Database, match_id: Uuid, user_id: Uuid) -> AppResult<Match> {
    db.transaction("get_match", |tx| participant_match(tx, match_id, user_id))
}

pub fn send_message(db: &Database, sender_id: Uuid, match_id: Uuid, text: &str) -> AppResult<SentMessage> {
    validate_text(text)?;

    let sent = db.transaction("send_message", |tx| {
        let m = participant_match(tx, match_id, sender_id)?;
        tx.lock_pair(m.pair())?;

        // a block may have removed the match while we waited for the lock
        if tx.find_match(match_id)?.is_none() {
            return Err(match_not_found());
        }

        let message = Message {
            id: Uuid::now_v7(),
            match_id,
            sender_id,
            text: text.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        tx.insert_message(&message)?;
        tx.touch_match(match_id, message.created_at)?;

        let recipient_id = m.other_participant(sender_id).unwrap_or(sender_id);
        Ok(SentMessage { message, recipient_id })
    })?;

    metrics::counter!("messages_sent_total").increment(1);
    tracing::info!(match_id = %match_id, message_id = %sent.message.id, "message sent");
    Ok(sent)
}

/// Earliest `limit` messages of the match, oldest first. Callers authorize.
pub fn list_messages(db: &Database, match_id: Uuid, limit: u32) -> AppResult<Vec<Message>> {
    db.transaction("list_messages", |tx| tx.list_messages(match_id, limit))
}

/// Marks the other participant's messages as read; returns how many changed.
pub fn mark_read(db: &Database, match_id: Uuid, reader_id: Uuid) -> AppResult<usize> {
    let updated = db.transaction("mark_read", |tx| {
        participant_match(tx, match_id, reader_id)?;
        tx.mark_read(match_id, reader_id)
    })?;

    tracing::debug!(match_id = %match_id, updated, "messages marked read");
    Ok(updated)
}

fn participant_match(tx: &mut dyn StoreTx, match_id: Uuid, user_id: Uuid) -> AppResult<Match> {
    let m = tx.find_match(match_id)?.ok_or_else(match_not_found)?;
    if !m.involves(user_id) {
        return Err(AppError::new(ErrorCode::NotMatchParticipant, "not a participant of this match"));
    }
    Ok(m)
}

fn match_not_found() -> AppError {
    AppError::new(ErrorCode::MatchNotFound, "match not found")
}

fn validate_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::new(ErrorCode::EmptyMessage, "message text is empty"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::new(
            ErrorCode::MessageTooLong,
            format!("message exceeds {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(())
}
