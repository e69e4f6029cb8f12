//! Movie catalog abstraction.
//!
//! The dashboard depends on this trait rather than on TMDB directly, so
//! aggregation and enrichment stay testable without the network.

pub mod tmdb;

pub use tmdb::TmdbCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Movie not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One movie as the catalog reports it. Detail lookups return the same
/// shape; the fields a watchlist entry snapshots are a subset of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
}

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// One page of currently-popular movies, in the order the catalog ranks them
    async fn fetch_popular(&self, page: u32) -> Result<Vec<MovieSummary>, CatalogError>;

    /// Details for a single movie
    async fn fetch_by_id(&self, movie_id: i64) -> Result<MovieSummary, CatalogError>;

    /// Title search
    async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, CatalogError>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
