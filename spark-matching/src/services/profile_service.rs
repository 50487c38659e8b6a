use chrono::Utc;
use uuid::Uuid;

use spark_shared::errors::{AppError, AppResult, ErrorCode};
use spark_shared::types::event::payloads::UserRegistered;

use crate::models::{Profile, ProfileChanges, User, UserWithProfile};
use crate::store::{Database, StoreTx};

/// Records a user announced by the identity service. Existing rows keep their
/// onboarding state; only the identity-owned flags are refreshed.
pub fn register_user(db: &Database, registered: &UserRegistered) -> AppResult<User> {
    let user = db.transaction("register_user", |tx| {
        let mut user = tx
            .find_user(registered.user_id)?
            .unwrap_or_else(|| User::new(registered.user_id, Utc::now()));
        user.is_admin = registered.is_admin;
        user.is_verified = registered.is_verified;
        tx.save_user(&user)?;
        Ok(user)
    })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// The caller's user record and profile. A user this service has not seen
/// yet is reported as fresh and not onboarded.
pub fn get_user(db: &Database, user_id: Uuid) -> AppResult<UserWithProfile> {
    db.transaction("get_user", |tx| {
        let user = tx
            .find_user(user_id)?
            .unwrap_or_else(|| User::new(user_id, Utc::now()));
        let profile = tx.find_profile(user_id)?;
        Ok(UserWithProfile { user, profile })
    })
}

pub fn get_profile(db: &Database, user_id: Uuid) -> AppResult<Profile> {
    db.transaction("get_profile", |tx| tx.find_profile(user_id))?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Partial update; creates the profile when it does not exist yet.
pub fn update_profile(db: &Database, user_id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
    changes.check()?;

    let profile = db.transaction("update_profile", |tx| {
        ensure_user(tx, user_id)?;
        upsert_profile(tx, user_id, changes.clone())
    })?;

    tracing::info!(user_id = %user_id, "profile updated");
    Ok(profile)
}

/// Creates or updates the profile and flags the user as onboarded, in one
/// transaction.
pub fn onboard(db: &Database, user_id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
    changes.check()?;

    let profile = db.transaction("onboard", |tx| {
        let mut user = ensure_user(tx, user_id)?;
        let profile = upsert_profile(tx, user_id, changes.clone())?;
        if !user.is_onboarded {
            user.is_onboarded = true;
            tx.save_user(&user)?;
        }
        Ok(profile)
    })?;

    tracing::info!(user_id = %user_id, "user onboarded");
    Ok(profile)
}

fn ensure_user(tx: &mut dyn StoreTx, user_id: Uuid) -> AppResult<User> {
    match tx.find_user(user_id)? {
        Some(user) => Ok(user),
        None => {
            let user = User::new(user_id, Utc::now());
            tx.save_user(&user)?;
            Ok(user)
        }
    }
}

fn upsert_profile(tx: &mut dyn StoreTx, user_id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
    let now = Utc::now();
    let mut profile = tx
        .find_profile(user_id)?
        .unwrap_or_else(|| Profile::new(user_id, now));
    changes.apply(&mut profile);
    profile.updated_at = now;
    tx.save_profile(&profile)?;
    Ok(profile)
}
