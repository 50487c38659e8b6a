use chrono::Utc;
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Block, Match, PairKey, Report};
use crate::store::Database;

pub const MAX_REASON_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub struct BlockOutcome {
    pub block: Block,
    /// False when the block already existed.
    pub created: bool,
    pub removed_match: Option<Match>,
}

/// Records the block and deletes any match between the two users, messages
/// included, in the same transaction. Blocking someone twice returns the
/// existing block.
pub fn create_block(db: &Database, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<BlockOutcome> {
    if blocker_id == blocked_id {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "cannot block yourself"));
    }

    let pair = PairKey::new(blocker_id, blocked_id);

    let outcome = db.transaction("create_block", |tx| {
        tx.lock_pair(pair)?;

        let (block, created) = match tx.find_block(blocker_id, blocked_id)? {
            Some(existing) => (existing, false),
            None => {
                let block = Block { blocker_id, blocked_id, created_at: Utc::now() };
                tx.insert_block(&block)?;
                (block, true)
            }
        };

        let removed_match = match tx.find_match_for_pair(pair)? {
            Some(m) => {
                tx.delete_match(m.id)?;
                Some(m)
            }
            None => None,
        };

        Ok(BlockOutcome { block, created, removed_match })
    })?;

    if outcome.created {
        metrics::counter!("blocks_total").increment(1);
    }
    tracing::info!(
        blocker_id = %blocker_id,
        blocked_id = %blocked_id,
        created = outcome.created,
        removed_match = ?outcome.removed_match.as_ref().map(|m| m.id),
        "block recorded"
    );
    Ok(outcome)
}

/// Append-only; has no effect on matches or blocks.
pub fn create_report(db: &Database, reporter_id: Uuid, reported_id: Uuid, reason: &str) -> AppResult<Report> {
    if reporter_id == reported_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "cannot report yourself"));
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyReportReason, "report reason is required"));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(AppError::bad_request(format!("reason exceeds {MAX_REASON_CHARS} characters")));
    }

    let report = Report {
        id: Uuid::now_v7(),
        reporter_id,
        reported_id,
        reason: reason.to_string(),
        created_at: Utc::now(),
    };
    db.transaction("create_report", |tx| tx.insert_report(&report))?;

    metrics::counter!("reports_total").increment(1);
    tracing::info!(report_id = %report.id, reporter_id = %reporter_id, reported_id = %reported_id, "report filed");
    Ok(report)
}

/// Deletes the match if `user_id` is one of its participants. Returns the
/// removed match, or `None` when there was nothing the caller may remove.
pub fn unmatch(db: &Database, match_id: Uuid, user_id: Uuid) -> AppResult<Option<Match>> {
    let removed = db.transaction("unmatch", |tx| {
        let Some(m) = tx.find_match(match_id)? else { return Ok(None) };
        if !m.involves(user_id) {
            return Ok(None);
        }
        tx.lock_pair(m.pair())?;
        Ok(tx.delete_match(match_id)?.then_some(m))
    })?;

    match &removed {
        Some(_) => tracing::info!(match_id = %match_id, user_id = %user_id, "match removed"),
        None => tracing::debug!(match_id = %match_id, user_id = %user_id, "unmatch ignored"),
    }
    Ok(removed)
}
