use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::schema::{blocks, matches, messages, reports, swipes, users};

// --- Pair ---

/// An unordered pair of users in canonical order: `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub low: Uuid,
    pub high: Uuid,
}

impl PairKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Stable 64-bit key for `pg_advisory_xact_lock`, identical on every
    /// instance and every build.
    pub fn lock_key(&self) -> i64 {
        let mut hasher = Sha256::new();
        hasher.update(self.low.as_bytes());
        hasher.update(self.high.as_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(prefix)
    }
}

// --- User ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub is_onboarded: bool,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            is_onboarded: false,
            is_admin: false,
            is_verified: false,
            created_at: now,
        }
    }
}

/// `/users/me` payload.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
}

// --- Profile ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub orientation: Option<String>,
    pub relationship_goals: Option<String>,
    pub lifestyle_tags: Vec<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub school: Option<String>,
    pub location: Option<GeoPoint>,
    pub images: Vec<String>,
    pub interests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            name: None,
            age: None,
            bio: None,
            gender: None,
            orientation: None,
            relationship_goals: None,
            lifestyle_tags: Vec::new(),
            job_title: None,
            company: None,
            school: None,
            location: None,
            images: Vec::new(),
            interests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. A field left out of the request stays as it is,
/// an explicit `null` clears it, and any other value overwrites, even an
/// empty one. List fields are cleared with `[]`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileChanges {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 50))]
    pub name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(range(min = 18, max = 120))]
    pub age: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 500))]
    pub bio: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 30))]
    pub gender: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 30))]
    pub orientation: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 50))]
    pub relationship_goals: Option<Option<String>>,
    #[serde(alias = "lifestyle_badges")]
    pub lifestyle_tags: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 100))]
    pub job_title: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 100))]
    pub company: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 100))]
    pub school: Option<Option<String>>,
    // bounds checked in `check`
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub location: Option<Option<GeoPoint>>,
    #[validate(length(max = 9))]
    pub images: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
}

impl ProfileChanges {
    /// Field rules plus the coordinate ranges of a supplied location.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        if let Some(Some(location)) = &self.location {
            location.validate()?;
        }
        Ok(())
    }

    pub fn apply(self, profile: &mut Profile) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        set(&mut profile.name, self.name);
        set(&mut profile.age, self.age);
        set(&mut profile.bio, self.bio);
        set(&mut profile.gender, self.gender);
        set(&mut profile.orientation, self.orientation);
        set(&mut profile.relationship_goals, self.relationship_goals);
        set(&mut profile.job_title, self.job_title);
        set(&mut profile.company, self.company);
        set(&mut profile.school, self.school);
        set(&mut profile.location, self.location);
        set(&mut profile.lifestyle_tags, self.lifestyle_tags.map(dedup_tags));
        set(&mut profile.images, self.images);
        set(&mut profile.interests, self.interests.map(dedup_tags));
    }
}

/// Tags are sets: drop repeats, keep first-seen order.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

// --- Swipe ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = swipes)]
pub struct Swipe {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    #[serde(rename = "is_match")]
    pub matched: bool,
    #[serde(skip)]
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
}

impl SwipeOutcome {
    pub fn duplicate() -> Self {
        Self { matched: false, recorded: false, match_id: None }
    }

    pub fn recorded() -> Self {
        Self { matched: false, recorded: true, match_id: None }
    }

    pub fn matched(match_id: Uuid) -> Self {
        Self { matched: true, recorded: true, match_id: Some(match_id) }
    }
}

// --- Match ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Match {
    pub fn new(pair: PairKey, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_a_id: pair.low,
            user_b_id: pair.high,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(self.user_a_id, self.user_b_id)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a_id == user_id {
            Some(self.user_b_id)
        } else if self.user_b_id == user_id {
            Some(self.user_a_id)
        } else {
            None
        }
    }
}

/// The other participant as shown in a match list.
#[derive(Debug, Clone, Serialize)]
pub struct MatchPartner {
    pub id: Uuid,
    pub is_verified: bool,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    #[serde(rename = "id")]
    pub match_id: Uuid,
    pub user: MatchPartner,
    pub last_message: Option<Message>,
    pub unread_count: i64,
    #[serde(rename = "timestamp")]
    pub last_activity_at: DateTime<Utc>,
}

// --- Message ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// --- Safety ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = blocks)]
pub struct Block {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        assert_eq!(PairKey::new(a, b).lock_key(), PairKey::new(b, a).lock_key());
        assert!(PairKey::new(b, a).low < PairKey::new(b, a).high);
    }

    #[test]
    fn match_stores_lower_id_first() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let m = Match::new(PairKey::new(b, a), Utc::now());
        assert!(m.user_a_id < m.user_b_id);
        assert_eq!(m.other_participant(a), Some(b));
        assert_eq!(m.other_participant(b), Some(a));
        assert_eq!(m.other_participant(Uuid::now_v7()), None);
    }

    #[test]
    fn absent_fields_are_left_untouched() {
        let mut profile = Profile::new(Uuid::now_v7(), Utc::now());
        profile.name = Some("Ada".into());
        profile.bio = Some("hello".into());

        ProfileChanges {
            bio: Some(Some(String::new())),
            interests: Some(vec!["climbing".into(), "jazz".into(), "climbing".into()]),
            ..Default::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.bio.as_deref(), Some(""));
        assert_eq!(profile.interests, vec!["climbing", "jazz"]);
        assert!(profile.images.is_empty());
    }

    #[test]
    fn explicit_null_clears_and_absent_keeps() {
        let mut profile = Profile::new(Uuid::now_v7(), Utc::now());
        profile.name = Some("Ada".into());
        profile.job_title = Some("engineer".into());
        profile.location = Some(GeoPoint { latitude: 1.0, longitude: 2.0 });

        let changes: ProfileChanges =
            serde_json::from_str(r#"{"location": null, "name": null}"#).unwrap();
        assert_eq!(changes.location, Some(None));
        assert_eq!(changes.job_title, None);
        changes.apply(&mut profile);

        assert_eq!(profile.name, None);
        assert_eq!(profile.location, None);
        assert_eq!(profile.job_title.as_deref(), Some("engineer"));
    }

    #[test]
    fn underage_profile_fails_validation() {
        let changes = ProfileChanges { age: Some(Some(16)), ..Default::default() };
        assert!(changes.check().is_err());

        let changes = ProfileChanges {
            location: Some(Some(GeoPoint { latitude: 120.0, longitude: 0.0 })),
            ..Default::default()
        };
        assert!(changes.check().is_err());

        let cleared = ProfileChanges { age: Some(None), location: Some(None), ..Default::default() };
        assert!(cleared.check().is_ok());
    }
}
