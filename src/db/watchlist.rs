//! Watchlist store: SQL access to saved movies.

use chrono::Utc;
use uuid::Uuid;

use super::{AddToWatchlistRequest, DbPool, WatchlistEntry};

/// Insert a snapshot of the movie for this user. Violates the
/// (user_id, movie_id) UNIQUE constraint when the pair already exists;
/// the service layer folds that into an already-present outcome.
pub async fn insert(
    pool: &DbPool,
    user_id: &str,
    req: &AddToWatchlistRequest,
) -> Result<WatchlistEntry, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO watchlist (id, user_id, movie_id, movie_title, poster_path, overview, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(req.movie_id)
    .bind(&req.title)
    .bind(&req.poster_path)
    .bind(&req.overview)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn is_member(pool: &DbPool, user_id: &str, movie_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM watchlist WHERE user_id = ? AND movie_id = ?")
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Entries in the order they were saved.
pub async fn list_by_user(pool: &DbPool, user_id: &str) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>(
        "SELECT * FROM watchlist WHERE user_id = ? ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Delete one of the caller's entries. Deleting an id that does not exist,
/// or that belongs to someone else, touches nothing and is not an error.
pub async fn remove(pool: &DbPool, entry_id: &str, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM watchlist")
        .fetch_one(pool)
        .await
}
