//! Domain services over the stores and the catalog.
//!
//! Handlers stay thin: the rules for accounts, watchlists and dashboard
//! assembly live here, written against the stores and the catalog trait.

mod accounts;
mod dashboard;
mod watchlist;

pub use accounts::LoginOutcome;
pub use dashboard::{Dashboard, EnrichedEntry, MovieDetails, SortKey};
pub use watchlist::{AddOutcome, RemoveOutcome};

use std::sync::Arc;

use crate::catalog::{CatalogError, MovieCatalog};
use crate::db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(CatalogError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Fold a catalog failure into the service taxonomy. A 404 from the
    /// catalog is a missing movie; everything else means the catalog is not
    /// usable right now.
    fn from_catalog(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => ServiceError::NotFound("Movie not found".to_string()),
            other => ServiceError::Unavailable(other),
        }
    }
}

/// True when a write was rejected by a UNIQUE constraint. Writers that lose
/// the race between their existence check and their insert end up here.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

#[derive(Clone)]
pub struct WatchlistService {
    db: DbPool,
    catalog: Arc<dyn MovieCatalog>,
    fanout_limit: usize,
}

impl WatchlistService {
    pub fn new(db: DbPool, catalog: Arc<dyn MovieCatalog>, fanout_limit: usize) -> Self {
        Self {
            db,
            catalog,
            // A limit of zero would stall the enrichment stream
            fanout_limit: fanout_limit.max(1),
        }
    }
}
