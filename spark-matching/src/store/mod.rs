//! Persistence boundary.
//!
//! Every engine operation runs inside one [`Store::transaction`]. Writes that
//! touch a user pair call [`StoreTx::lock_pair`] first, so swipes, match
//! creation, message sends and blocks on the same pair are serialized while
//! disjoint pairs proceed in parallel.

mod memory;
mod postgres;
mod retry;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult};

use crate::models::{Block, Match, Message, PairKey, Profile, Report, Swipe, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::RetryPolicy;

/// Row-level operations available inside a transaction.
pub trait StoreTx {
    /// Mutual exclusion scoped to an unordered pair, held until the
    /// transaction ends.
    fn lock_pair(&mut self, pair: PairKey) -> AppResult<()>;

    fn ping(&mut self) -> AppResult<()>;

    // Users / profiles
    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>>;
    fn save_user(&mut self, user: &User) -> AppResult<()>;
    fn find_profile(&mut self, user_id: Uuid) -> AppResult<Option<Profile>>;
    fn save_profile(&mut self, profile: &Profile) -> AppResult<()>;
    /// Profiles whose owner is not in `excluded`, ascending by user id.
    fn discover_profiles(
        &mut self,
        excluded: &[Uuid],
        gender: Option<&str>,
        limit: u32,
    ) -> AppResult<Vec<Profile>>;

    // Swipes
    fn find_swipe(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Swipe>>;
    fn insert_swipe(&mut self, swipe: &Swipe) -> AppResult<()>;
    fn swiped_target_ids(&mut self, actor_id: Uuid) -> AppResult<Vec<Uuid>>;

    // Matches
    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>>;
    fn find_match_for_pair(&mut self, pair: PairKey) -> AppResult<Option<Match>>;
    fn insert_match(&mut self, m: &Match) -> AppResult<()>;
    fn matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>>;
    fn touch_match(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    /// Deletes the match and every message in it. Returns whether a row was removed.
    fn delete_match(&mut self, id: Uuid) -> AppResult<bool>;

    // Messages
    fn insert_message(&mut self, message: &Message) -> AppResult<()>;
    /// Earliest `limit` messages, ascending by timestamp.
    fn list_messages(&mut self, match_id: Uuid, limit: u32) -> AppResult<Vec<Message>>;
    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>>;
    fn count_unread(&mut self, match_id: Uuid, sender_id: Uuid) -> AppResult<i64>;
    /// Marks messages in the match not sent by `reader_id` as read.
    fn mark_read(&mut self, match_id: Uuid, reader_id: Uuid) -> AppResult<usize>;

    // Safety
    fn find_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<Block>>;
    fn block_exists_between(&mut self, pair: PairKey) -> AppResult<bool>;
    fn insert_block(&mut self, block: &Block) -> AppResult<()>;
    fn blocked_ids(&mut self, blocker_id: Uuid) -> AppResult<Vec<Uuid>>;
    fn blocker_ids(&mut self, blocked_id: Uuid) -> AppResult<Vec<Uuid>>;
    fn insert_report(&mut self, report: &Report) -> AppResult<()>;
}

pub trait Store: Send + Sync {
    /// Run `f` atomically. Nothing it wrote is visible to other transactions
    /// unless it returns `Ok`.
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>;
}

#[derive(Clone)]
enum Backend {
    Postgres(PgStore),
    Memory(MemoryStore),
}

/// Handle passed to the services: the configured backend plus the retry
/// policy for transient conflicts.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
    retry: RetryPolicy,
}

impl Database {
    pub fn postgres(store: PgStore, retry: RetryPolicy) -> Self {
        Self { backend: Backend::Postgres(store), retry }
    }

    pub fn in_memory() -> Self {
        Self::memory(MemoryStore::default(), RetryPolicy::default())
    }

    pub fn memory(store: MemoryStore, retry: RetryPolicy) -> Self {
        Self { backend: Backend::Memory(store), retry }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory(_) => "memory",
        }
    }

    pub fn ping(&self) -> AppResult<()> {
        self.transaction("ping", |tx| tx.ping())
    }

    /// Run `f` in a transaction, re-running the whole thing on transient
    /// conflicts until the retry policy is exhausted.
    pub fn transaction<T, F>(&self, op: &'static str, mut f: F) -> AppResult<T>
    where
        F: FnMut(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut attempt = 1;
        loop {
            let result = match &self.backend {
                Backend::Postgres(store) => store.transaction(&mut f),
                Backend::Memory(store) => store.transaction(&mut f),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(op, attempt, delay_ms = delay.as_millis() as u64, error = %err, "transaction conflict, retrying");
                    metrics::counter!("tx_retries_total", "op" => op).increment(1);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    tracing::error!(op, attempt, error = %err, "transaction conflict, giving up");
                    return Err(AppError::conflict(format!(
                        "{op} could not complete after {attempt} attempts, please retry"
                    )));
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_shared::errors::ErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, backoff_base: Duration::from_millis(1) }
    }

    #[test]
    fn retries_transient_conflicts_then_succeeds() {
        let db = Database::memory(MemoryStore::default(), fast_retry(3));
        let calls = AtomicU32::new(0);

        let out = db
            .transaction("test", |_tx| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::conflict("serialization failure"))
                } else {
                    Ok(7)
                }
            })
            .unwrap();

        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let db = Database::memory(MemoryStore::default(), fast_retry(3));
        let calls = AtomicU32::new(0);

        let err = db
            .transaction("test", |_tx| -> AppResult<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::conflict("serialization failure"))
            })
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let db = Database::memory(MemoryStore::default(), fast_retry(5));
        let calls = AtomicU32::new(0);

        let err = db
            .transaction("test", |_tx| -> AppResult<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("nope"))
            })
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
