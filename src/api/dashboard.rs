//! Dashboard and catalog browsing endpoints.
//!
//! The dashboard is deliberately forgiving: catalog or database trouble
//! degrades the view (empty sections plus a note in `error`) instead of
//! failing the request. The raw catalog endpoints below it propagate
//! errors normally.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::access::CurrentUser;
use crate::catalog::MovieSummary;
use crate::service::{Dashboard, MovieDetails, SortKey};
use crate::AppState;

use super::auth::MaybeUser;
use super::error::ApiError;
use super::validation::{validate_movie_id, validate_page, validate_search_query};

/// Query parameters for the dashboard view
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<u32>,
    pub sort: Option<String>,
}

/// Query parameters for raw catalog pages
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// Query parameters for catalog search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// The combined browse-plus-watchlist view. Anonymous callers get the
/// browse section only.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<DashboardQuery>,
) -> Json<Dashboard> {
    let current = user.as_ref().map(CurrentUser::from);
    let page = params.page.unwrap_or(1);
    let sort = params
        .sort
        .as_deref()
        .map(SortKey::from)
        .unwrap_or_default();

    Json(state.service.build_dashboard(current.as_ref(), page, sort).await)
}

/// One raw page of popular movies
pub async fn browse_popular(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Vec<MovieSummary>>, ApiError> {
    let page = params.page.unwrap_or(1);
    if let Err(e) = validate_page(page) {
        return Err(ApiError::validation_field("page", e));
    }

    let movies = state.service.browse_page(page).await?;
    Ok(Json(movies))
}

/// Title search against the catalog
pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<MovieSummary>>, ApiError> {
    if let Err(e) = validate_search_query(&params.query) {
        return Err(ApiError::validation_field("query", e));
    }

    let movies = state.service.search(params.query.trim()).await?;
    Ok(Json(movies))
}

/// Detail view for one movie, with an `already_added` flag for the caller
pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(movie_id): Path<i64>,
) -> Result<Json<MovieDetails>, ApiError> {
    if let Err(e) = validate_movie_id(movie_id) {
        return Err(ApiError::validation_field("movie_id", e));
    }

    let current = user.as_ref().map(CurrentUser::from);
    let details = state
        .service
        .movie_details(current.as_ref(), movie_id)
        .await?;
    Ok(Json(details))
}
