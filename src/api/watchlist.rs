//! Watchlist endpoints. Every route requires a logged-in caller and only
//! ever touches that caller's own rows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{AddToWatchlistRequest, User, WatchlistEntry};
use crate::service::{AddOutcome, RemoveOutcome};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_movie_id, validate_movie_title};

/// Validate an AddToWatchlistRequest
fn validate_add_request(req: &AddToWatchlistRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_movie_id(req.movie_id) {
        errors.add("movie_id", &e);
    }

    if let Err(e) = validate_movie_title(&req.title) {
        errors.add("title", &e);
    }

    errors.finish()
}

/// List the caller's watchlist in insertion order
pub async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<WatchlistEntry>>, ApiError> {
    let entries = state.service.watchlist_for(&user.id).await?;
    Ok(Json(entries))
}

/// Add a movie snapshot to the caller's watchlist. A repeat add reports
/// `already_present` with a 200 instead of failing.
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<AddToWatchlistRequest>,
) -> Result<(StatusCode, Json<AddOutcome>), ApiError> {
    validate_add_request(&request)?;

    let outcome = state.service.add_to_watchlist(&user.id, &request).await?;
    let status = match outcome {
        AddOutcome::Added { .. } => StatusCode::CREATED,
        AddOutcome::AlreadyPresent => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}

/// Remove an entry from the caller's watchlist. Removal is idempotent;
/// entries owned by other users are out of reach and report the same way.
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(entry_id): Path<String>,
) -> Result<Json<RemoveOutcome>, ApiError> {
    let outcome = state
        .service
        .remove_from_watchlist(&user.id, &entry_id)
        .await?;
    Ok(Json(outcome))
}
