use chrono::Utc;
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, PairKey, Swipe, SwipeOutcome};
use crate::store::Database;

/// A committed swipe and, when it completed a mutual like, the match it created.
#[derive(Debug, Clone)]
pub struct SwipeResult {
    pub outcome: SwipeOutcome,
    pub created_match: Option<Match>,
}

/// Records `actor`'s decision about `target` and creates the match when the
/// like is reciprocated.
///
/// The whole check-then-write sequence runs under the pair lock, so two
/// reciprocal likes racing each other produce exactly one match and exactly
/// one `matched` outcome. A repeated decision is a no-op, never an error.
pub fn record_swipe(db: &Database, actor: Uuid, target: Uuid, liked: bool) -> AppResult<SwipeResult> {
    if actor == target {
        return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe on yourself"));
    }

    let pair = PairKey::new(actor, target);

    let result = db.transaction("record_swipe", |tx| {
        tx.lock_pair(pair)?;

        if tx.find_profile(target)?.is_none() {
            return Err(AppError::new(ErrorCode::ProfileNotFound, "target profile not found"));
        }

        if tx.find_swipe(actor, target)?.is_some() {
            return Ok(SwipeResult { outcome: SwipeOutcome::duplicate(), created_match: None });
        }

        let now = Utc::now();
        tx.insert_swipe(&Swipe { actor_id: actor, target_id: target, liked, created_at: now })?;

        if !liked {
            return Ok(SwipeResult { outcome: SwipeOutcome::recorded(), created_match: None });
        }

        let reciprocated = tx.find_swipe(target, actor)?.is_some_and(|s| s.liked);
        if !reciprocated || tx.block_exists_between(pair)? {
            return Ok(SwipeResult { outcome: SwipeOutcome::recorded(), created_match: None });
        }

        if tx.find_match_for_pair(pair)?.is_some() {
            return Ok(SwipeResult { outcome: SwipeOutcome::recorded(), created_match: None });
        }

        let m = Match::new(pair, now);
        tx.insert_match(&m)?;
        Ok(SwipeResult { outcome: SwipeOutcome::matched(m.id), created_match: Some(m) })
    })?;

    if result.outcome.recorded {
        metrics::counter!("swipes_total", "liked" => liked.to_string()).increment(1);
    }
    if let Some(m) = &result.created_match {
        metrics::counter!("matches_created_total").increment(1);
        tracing::info!(match_id = %m.id, user_a = %m.user_a_id, user_b = %m.user_b_id, "match created");
    } else {
        tracing::debug!(actor = %actor, target = %target, liked, recorded = result.outcome.recorded, "swipe processed");
    }

    Ok(result)
}
