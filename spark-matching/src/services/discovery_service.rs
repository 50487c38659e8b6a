use uuid::Uuid;

use spark_shared::errors::AppResult;

use crate::models::Profile;
use crate::store::Database;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct DiscoveryQuery {
    pub limit: u32,
    pub gender: Option<String>,
}

/// Candidate profiles for `user_id`: everyone with a profile except the user,
/// anyone they already swiped on, and anyone connected to them by a block in
/// either direction. Ascending by user id; no ranking.
pub fn discover(db: &Database, user_id: Uuid, query: &DiscoveryQuery) -> AppResult<Vec<Profile>> {
    let gender = query.gender.as_deref().filter(|g| !g.is_empty());

    let candidates = db.transaction("discover", |tx| {
        let mut excluded = vec![user_id];
        excluded.extend(tx.swiped_target_ids(user_id)?);
        excluded.extend(tx.blocked_ids(user_id)?);
        excluded.extend(tx.blocker_ids(user_id)?);
        excluded.sort_unstable();
        excluded.dedup();

        tx.discover_profiles(&excluded, gender, query.limit)
    })?;

    tracing::debug!(user_id = %user_id, returned = candidates.len(), "discovery computed");
    Ok(candidates)
}
