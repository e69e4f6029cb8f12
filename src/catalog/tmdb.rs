//! TMDB-backed movie catalog.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::metrics::record_catalog_request;
use crate::config::CatalogConfig;

use super::{CatalogError, MovieCatalog, MovieSummary};

pub struct TmdbCatalog {
    api_key: String,
    base_url: String,
    client: Client,
}

impl TmdbCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("TMDB request URL: {}", url);

        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        query.extend_from_slice(params);

        let response = self.client.get(&url).query(&query).send().await?;

        if response.status() == 401 {
            return Err(CatalogError::InvalidApiKey);
        }
        if response.status() == 404 {
            return Err(CatalogError::NotFound);
        }
        if response.status() == 429 {
            return Err(CatalogError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(CatalogError::Api(format!(
                "TMDB API returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: Option<String>,
    poster_path: Option<String>,
    overview: Option<String>,
    vote_average: Option<f64>,
    release_date: Option<String>,
}

impl From<TmdbMovie> for MovieSummary {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.unwrap_or_else(|| "Unknown".to_string()),
            poster_path: movie.poster_path,
            overview: movie.overview,
            vote_average: movie.vote_average,
            // TMDB sends "" for unreleased titles; treat that as absent
            release_date: movie.release_date.filter(|date| !date.is_empty()),
        }
    }
}

#[async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn fetch_popular(&self, page: u32) -> Result<Vec<MovieSummary>, CatalogError> {
        let page_param = page.to_string();
        let result = self
            .get_json::<TmdbPage>("/movie/popular", &[("page", page_param.as_str())])
            .await;
        record_catalog_request("popular", result.is_ok());

        Ok(result?.results.into_iter().map(MovieSummary::from).collect())
    }

    async fn fetch_by_id(&self, movie_id: i64) -> Result<MovieSummary, CatalogError> {
        let result = self
            .get_json::<TmdbMovie>(&format!("/movie/{}", movie_id), &[])
            .await;
        record_catalog_request("details", result.is_ok());

        Ok(MovieSummary::from(result?))
    }

    async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, CatalogError> {
        let result = self
            .get_json::<TmdbPage>("/search/movie", &[("query", query)])
            .await;
        record_catalog_request("search", result.is_ok());

        Ok(result?.results.into_iter().map(MovieSummary::from).collect())
    }

    fn name(&self) -> &'static str {
        "TMDB"
    }
}
