pub mod discovery;
pub mod health;
pub mod matches;
pub mod messages;
pub mod profile;
pub mod safety;
pub mod swipes;

use std::sync::Arc;

use spark_shared::errors::{AppError, AppResult};

use crate::store::Database;
use crate::AppState;

/// Run a store-bound service call on the blocking pool.
pub(crate) async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    F: FnOnce(&Database) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
}
