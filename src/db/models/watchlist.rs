//! Watchlist entry models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A saved movie. Title, poster and overview are denormalized at save time
/// so the list renders without catalog round-trips, and survives the movie
/// disappearing upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WatchlistEntry {
    pub id: String,
    pub user_id: String,
    pub movie_id: i64,
    pub movie_title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub created_at: String,
}

/// Request to save a movie. The client sends the snapshot fields it already
/// holds from the browse view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToWatchlistRequest {
    pub movie_id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}
