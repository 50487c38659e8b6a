use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult};

use super::{Store, StoreTx};
use crate::models::{Block, Match, Message, PairKey, Profile, Report, Swipe, User};

const MAX_ID: Uuid = Uuid::from_u128(u128::MAX);

/// Process-local store. A transaction runs against a copy of the state while
/// holding the single lock and commits by swapping the copy in, so every
/// transaction is serialized and an error leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Clone, Default)]
struct MemoryState {
    users: BTreeMap<Uuid, User>,
    profiles: BTreeMap<Uuid, Profile>,
    swipes: BTreeMap<(Uuid, Uuid), Swipe>,
    matches: BTreeMap<Uuid, Match>,
    // insertion order doubles as the tiebreak for equal timestamps
    messages: Vec<Message>,
    blocks: BTreeMap<(Uuid, Uuid), Block>,
    reports: Vec<Report>,
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::internal("memory store lock poisoned"))?;

        let mut draft = guard.clone();
        let out = f(&mut MemoryTx { state: &mut draft })?;
        *guard = draft;
        Ok(out)
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl StoreTx for MemoryTx<'_> {
    fn lock_pair(&mut self, _pair: PairKey) -> AppResult<()> {
        // already exclusive: the whole store is locked for the transaction
        Ok(())
    }

    fn ping(&mut self) -> AppResult<()> {
        Ok(())
    }

    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    fn save_user(&mut self, user: &User) -> AppResult<()> {
        self.state.users.insert(user.id, user.clone());
        Ok(())
    }

    fn find_profile(&mut self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.state.profiles.get(&user_id).cloned())
    }

    fn save_profile(&mut self, profile: &Profile) -> AppResult<()> {
        self.state.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn discover_profiles(
        &mut self,
        excluded: &[Uuid],
        gender: Option<&str>,
        limit: u32,
    ) -> AppResult<Vec<Profile>> {
        Ok(self
            .state
            .profiles
            .values()
            .filter(|p| !excluded.contains(&p.user_id))
            .filter(|p| gender.map_or(true, |g| p.gender.as_deref() == Some(g)))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn find_swipe(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Swipe>> {
        Ok(self.state.swipes.get(&(actor_id, target_id)).cloned())
    }

    fn insert_swipe(&mut self, swipe: &Swipe) -> AppResult<()> {
        let key = (swipe.actor_id, swipe.target_id);
        if self.state.swipes.contains_key(&key) {
            return Err(AppError::conflict("swipe already recorded"));
        }
        self.state.swipes.insert(key, swipe.clone());
        Ok(())
    }

    fn swiped_target_ids(&mut self, actor_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .swipes
            .range((actor_id, Uuid::nil())..=(actor_id, MAX_ID))
            .map(|(_, s)| s.target_id)
            .collect())
    }

    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>> {
        Ok(self.state.matches.get(&id).cloned())
    }

    fn find_match_for_pair(&mut self, pair: PairKey) -> AppResult<Option<Match>> {
        Ok(self.state.matches.values().find(|m| m.pair() == pair).cloned())
    }

    fn insert_match(&mut self, m: &Match) -> AppResult<()> {
        if self.state.matches.values().any(|existing| existing.pair() == m.pair()) {
            return Err(AppError::conflict("match already exists for pair"));
        }
        self.state.matches.insert(m.id, m.clone());
        Ok(())
    }

    fn matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>> {
        Ok(self
            .state
            .matches
            .values()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect())
    }

    fn touch_match(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(m) = self.state.matches.get_mut(&id) {
            m.last_activity_at = at;
        }
        Ok(())
    }

    fn delete_match(&mut self, id: Uuid) -> AppResult<bool> {
        let removed = self.state.matches.remove(&id).is_some();
        self.state.messages.retain(|msg| msg.match_id != id);
        Ok(removed)
    }

    fn insert_message(&mut self, message: &Message) -> AppResult<()> {
        self.state.messages.push(message.clone());
        Ok(())
    }

    fn list_messages(&mut self, match_id: Uuid, limit: u32) -> AppResult<Vec<Message>> {
        let mut found: Vec<Message> = self
            .state
            .messages
            .iter()
            .filter(|m| m.match_id == match_id)
            .cloned()
            .collect();
        // stable: equal timestamps keep send order
        found.sort_by_key(|m| m.created_at);
        found.truncate(limit as usize);
        Ok(found)
    }

    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>> {
        Ok(self
            .state
            .messages
            .iter()
            .filter(|m| m.match_id == match_id)
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    fn count_unread(&mut self, match_id: Uuid, sender_id: Uuid) -> AppResult<i64> {
        Ok(self
            .state
            .messages
            .iter()
            .filter(|m| m.match_id == match_id && m.sender_id == sender_id && !m.is_read)
            .count() as i64)
    }

    fn mark_read(&mut self, match_id: Uuid, reader_id: Uuid) -> AppResult<usize> {
        let mut updated = 0;
        for m in self
            .state
            .messages
            .iter_mut()
            .filter(|m| m.match_id == match_id && m.sender_id != reader_id && !m.is_read)
        {
            m.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    fn find_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<Block>> {
        Ok(self.state.blocks.get(&(blocker_id, blocked_id)).cloned())
    }

    fn block_exists_between(&mut self, pair: PairKey) -> AppResult<bool> {
        Ok(self.state.blocks.contains_key(&(pair.low, pair.high))
            || self.state.blocks.contains_key(&(pair.high, pair.low)))
    }

    fn insert_block(&mut self, block: &Block) -> AppResult<()> {
        self.state
            .blocks
            .insert((block.blocker_id, block.blocked_id), block.clone());
        Ok(())
    }

    fn blocked_ids(&mut self, blocker_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .blocks
            .range((blocker_id, Uuid::nil())..=(blocker_id, MAX_ID))
            .map(|(_, b)| b.blocked_id)
            .collect())
    }

    fn blocker_ids(&mut self, blocked_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .blocks
            .values()
            .filter(|b| b.blocked_id == blocked_id)
            .map(|b| b.blocker_id)
            .collect())
    }

    fn insert_report(&mut self, report: &Report) -> AppResult<()> {
        self.state.reports.push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let store = MemoryStore::default();
        let user = User::new(Uuid::now_v7(), Utc::now());

        let err = store
            .transaction(|tx| -> AppResult<()> {
                tx.save_user(&user)?;
                Err(AppError::internal("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Known { .. }));

        let found = store.transaction(|tx| tx.find_user(user.id)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn deleting_a_match_drops_its_messages() {
        let store = MemoryStore::default();
        let pair = PairKey::new(Uuid::now_v7(), Uuid::now_v7());
        let m = Match::new(pair, Utc::now());

        store
            .transaction(|tx| {
                tx.insert_match(&m)?;
                tx.insert_message(&Message {
                    id: Uuid::now_v7(),
                    match_id: m.id,
                    sender_id: pair.low,
                    text: "hi".into(),
                    is_read: false,
                    created_at: Utc::now(),
                })
            })
            .unwrap();

        let removed = store.transaction(|tx| tx.delete_match(m.id)).unwrap();
        assert!(removed);
        let left = store.transaction(|tx| tx.list_messages(m.id, 10)).unwrap();
        assert!(left.is_empty());
    }

    #[test]
    fn second_match_for_same_pair_is_a_conflict() {
        let store = MemoryStore::default();
        let pair = PairKey::new(Uuid::now_v7(), Uuid::now_v7());

        store.transaction(|tx| tx.insert_match(&Match::new(pair, Utc::now()))).unwrap();
        let err = store
            .transaction(|tx| tx.insert_match(&Match::new(pair, Utc::now())))
            .unwrap_err();
        assert!(err.is_transient());
    }
}
