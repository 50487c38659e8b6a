use chrono::{DateTime, Utc};
use diesel::dsl::{exists, not};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use uuid::Uuid;

use spark_shared::clients::db::DbPool;
use spark_shared::errors::{AppError, AppResult};

use super::{Store, StoreTx};
use crate::models::{Block, GeoPoint, Match, Message, PairKey, Profile, Report, Swipe, User};
use crate::schema::{blocks, matches, messages, profiles, reports, swipes, users};

/// PostgreSQL store on a diesel r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    statement_timeout_ms: u64,
}

impl PgStore {
    pub fn new(pool: DbPool, statement_timeout_ms: u64) -> Self {
        Self { pool, statement_timeout_ms }
    }
}

impl Store for PgStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut pooled = self
            .pool
            .get()
            .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<T, AppError, _>(|conn| {
            // deadline for every statement in this transaction; expiry aborts and rolls back
            diesel::sql_query(format!("SET LOCAL statement_timeout = {}", self.statement_timeout_ms))
                .execute(conn)?;
            f(&mut PgTx { conn })
        })
    }
}

struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

// --- Profile row ---

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = profiles, primary_key(user_id), treat_none_as_null = true)]
struct ProfileRow {
    user_id: Uuid,
    name: Option<String>,
    age: Option<i32>,
    bio: Option<String>,
    gender: Option<String>,
    orientation: Option<String>,
    relationship_goals: Option<String>,
    lifestyle_tags: serde_json::Value,
    job_title: Option<String>,
    company: Option<String>,
    school: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    images: serde_json::Value,
    interests: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn string_list(value: serde_json::Value) -> AppResult<Vec<String>> {
    serde_json::from_value(value).map_err(|e| AppError::Internal(e.into()))
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> AppResult<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        };

        Ok(Profile {
            user_id: row.user_id,
            name: row.name,
            age: row.age,
            bio: row.bio,
            gender: row.gender,
            orientation: row.orientation,
            relationship_goals: row.relationship_goals,
            lifestyle_tags: string_list(row.lifestyle_tags)?,
            job_title: row.job_title,
            company: row.company,
            school: row.school,
            location,
            images: string_list(row.images)?,
            interests: string_list(row.interests)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Profile> for ProfileRow {
    fn from(p: &Profile) -> Self {
        Self {
            user_id: p.user_id,
            name: p.name.clone(),
            age: p.age,
            bio: p.bio.clone(),
            gender: p.gender.clone(),
            orientation: p.orientation.clone(),
            relationship_goals: p.relationship_goals.clone(),
            lifestyle_tags: serde_json::Value::from(p.lifestyle_tags.clone()),
            job_title: p.job_title.clone(),
            company: p.company.clone(),
            school: p.school.clone(),
            latitude: p.location.map(|l| l.latitude),
            longitude: p.location.map(|l| l.longitude),
            images: serde_json::Value::from(p.images.clone()),
            interests: serde_json::Value::from(p.interests.clone()),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl StoreTx for PgTx<'_> {
    fn lock_pair(&mut self, pair: PairKey) -> AppResult<()> {
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(pair.lock_key())
            .execute(self.conn)?;
        Ok(())
    }

    fn ping(&mut self) -> AppResult<()> {
        diesel::sql_query("SELECT 1").execute(self.conn)?;
        Ok(())
    }

    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(users::table.find(id).first::<User>(self.conn).optional()?)
    }

    fn save_user(&mut self, user: &User) -> AppResult<()> {
        diesel::insert_into(users::table)
            .values(user)
            .on_conflict(users::id)
            .do_update()
            .set((
                users::is_onboarded.eq(user.is_onboarded),
                users::is_admin.eq(user.is_admin),
                users::is_verified.eq(user.is_verified),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn find_profile(&mut self, user_id: Uuid) -> AppResult<Option<Profile>> {
        profiles::table
            .find(user_id)
            .first::<ProfileRow>(self.conn)
            .optional()?
            .map(Profile::try_from)
            .transpose()
    }

    fn save_profile(&mut self, profile: &Profile) -> AppResult<()> {
        let row = ProfileRow::from(profile);
        diesel::insert_into(profiles::table)
            .values(&row)
            .on_conflict(profiles::user_id)
            .do_update()
            .set(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn discover_profiles(
        &mut self,
        excluded: &[Uuid],
        gender: Option<&str>,
        limit: u32,
    ) -> AppResult<Vec<Profile>> {
        let mut query = profiles::table
            .filter(not(profiles::user_id.eq_any(excluded.to_vec())))
            .into_boxed();

        if let Some(gender) = gender {
            query = query.filter(profiles::gender.eq(gender));
        }

        query
            .order(profiles::user_id.asc())
            .limit(i64::from(limit))
            .load::<ProfileRow>(self.conn)?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }

    fn find_swipe(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Swipe>> {
        Ok(swipes::table
            .find((actor_id, target_id))
            .first::<Swipe>(self.conn)
            .optional()?)
    }

    fn insert_swipe(&mut self, swipe: &Swipe) -> AppResult<()> {
        diesel::insert_into(swipes::table).values(swipe).execute(self.conn)?;
        Ok(())
    }

    fn swiped_target_ids(&mut self, actor_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(swipes::table
            .filter(swipes::actor_id.eq(actor_id))
            .select(swipes::target_id)
            .load::<Uuid>(self.conn)?)
    }

    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>> {
        Ok(matches::table.find(id).first::<Match>(self.conn).optional()?)
    }

    fn find_match_for_pair(&mut self, pair: PairKey) -> AppResult<Option<Match>> {
        Ok(matches::table
            .filter(matches::user_a_id.eq(pair.low))
            .filter(matches::user_b_id.eq(pair.high))
            .first::<Match>(self.conn)
            .optional()?)
    }

    fn insert_match(&mut self, m: &Match) -> AppResult<()> {
        diesel::insert_into(matches::table).values(m).execute(self.conn)?;
        Ok(())
    }

    fn matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>> {
        Ok(matches::table
            .filter(matches::user_a_id.eq(user_id).or(matches::user_b_id.eq(user_id)))
            .load::<Match>(self.conn)?)
    }

    fn touch_match(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        diesel::update(matches::table.find(id))
            .set(matches::last_activity_at.eq(at))
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_match(&mut self, id: Uuid) -> AppResult<bool> {
        // messages go with it via ON DELETE CASCADE
        let deleted = diesel::delete(matches::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn insert_message(&mut self, message: &Message) -> AppResult<()> {
        diesel::insert_into(messages::table).values(message).execute(self.conn)?;
        Ok(())
    }

    fn list_messages(&mut self, match_id: Uuid, limit: u32) -> AppResult<Vec<Message>> {
        Ok(messages::table
            .filter(messages::match_id.eq(match_id))
            .order((messages::created_at.asc(), messages::id.asc()))
            .limit(i64::from(limit))
            .load::<Message>(self.conn)?)
    }

    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>> {
        Ok(messages::table
            .filter(messages::match_id.eq(match_id))
            .order((messages::created_at.desc(), messages::id.desc()))
            .first::<Message>(self.conn)
            .optional()?)
    }

    fn count_unread(&mut self, match_id: Uuid, sender_id: Uuid) -> AppResult<i64> {
        Ok(messages::table
            .filter(messages::match_id.eq(match_id))
            .filter(messages::sender_id.eq(sender_id))
            .filter(messages::is_read.eq(false))
            .count()
            .get_result::<i64>(self.conn)?)
    }

    fn mark_read(&mut self, match_id: Uuid, reader_id: Uuid) -> AppResult<usize> {
        Ok(diesel::update(
            messages::table
                .filter(messages::match_id.eq(match_id))
                .filter(messages::sender_id.ne(reader_id))
                .filter(messages::is_read.eq(false)),
        )
        .set(messages::is_read.eq(true))
        .execute(self.conn)?)
    }

    fn find_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<Block>> {
        Ok(blocks::table
            .find((blocker_id, blocked_id))
            .first::<Block>(self.conn)
            .optional()?)
    }

    fn block_exists_between(&mut self, pair: PairKey) -> AppResult<bool> {
        let forward = blocks::blocker_id.eq(pair.low).and(blocks::blocked_id.eq(pair.high));
        let backward = blocks::blocker_id.eq(pair.high).and(blocks::blocked_id.eq(pair.low));
        Ok(diesel::select(exists(blocks::table.filter(forward.or(backward))))
            .get_result::<bool>(self.conn)?)
    }

    fn insert_block(&mut self, block: &Block) -> AppResult<()> {
        diesel::insert_into(blocks::table)
            .values(block)
            .on_conflict_do_nothing()
            .execute(self.conn)?;
        Ok(())
    }

    fn blocked_ids(&mut self, blocker_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(blocks::table
            .filter(blocks::blocker_id.eq(blocker_id))
            .select(blocks::blocked_id)
            .load::<Uuid>(self.conn)?)
    }

    fn blocker_ids(&mut self, blocked_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(blocks::table
            .filter(blocks::blocked_id.eq(blocked_id))
            .select(blocks::blocker_id)
            .load::<Uuid>(self.conn)?)
    }

    fn insert_report(&mut self, report: &Report) -> AppResult<()> {
        diesel::insert_into(reports::table).values(report).execute(self.conn)?;
        Ok(())
    }
}
