//! Dashboard assembly: popular titles plus the caller's enriched watchlist.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::access::CurrentUser;
use crate::catalog::MovieSummary;
use crate::db::{watchlist, WatchlistEntry};

use super::{ServiceError, WatchlistService};

/// Sort orders for the browse pane. Anything unrecognized behaves as `None`,
/// which keeps the catalog's own ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Rating,
    Year,
    #[default]
    None,
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s {
            "title" => SortKey::Title,
            "rating" => SortKey::Rating,
            "year" => SortKey::Year,
            _ => SortKey::None,
        }
    }
}

/// A watchlist entry with its current catalog rating. `None` means the
/// rating could not be fetched; only this field pays for that failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub watchlist: Vec<EnrichedEntry>,
    pub browse: Vec<MovieSummary>,
    pub next_page: u32,
    pub sort: SortKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Movie detail plus whether the caller already saved it.
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetails {
    pub movie: MovieSummary,
    pub already_added: bool,
}

impl WatchlistService {
    /// Assemble the dashboard. Failures degrade instead of propagating: a
    /// dead catalog empties the whole view, an unreadable watchlist empties
    /// only the watchlist, and both leave a note in `error`.
    pub async fn build_dashboard(
        &self,
        current: Option<&CurrentUser>,
        page: u32,
        sort: SortKey,
    ) -> Dashboard {
        let page = page.max(1);
        let next_page = page + 1;

        let browse = match self.catalog.fetch_popular(page).await {
            Ok(movies) => sort_movies(movies, sort),
            Err(err) => {
                warn!("Failed to load popular movies: {}", err);
                return Dashboard {
                    watchlist: Vec::new(),
                    browse: Vec::new(),
                    next_page,
                    sort,
                    error: Some("Could not load content".to_string()),
                };
            }
        };

        let Some(current) = current else {
            return Dashboard {
                watchlist: Vec::new(),
                browse,
                next_page,
                sort,
                error: None,
            };
        };

        let entries = match watchlist::list_by_user(&self.db, &current.id).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Failed to load watchlist for user {}: {}", current.id, err);
                return Dashboard {
                    watchlist: Vec::new(),
                    browse,
                    next_page,
                    sort,
                    error: Some("Could not load watchlist".to_string()),
                };
            }
        };

        Dashboard {
            watchlist: self.enrich_entries(entries).await,
            browse,
            next_page,
            sort,
            error: None,
        }
    }

    /// Attach current ratings, a bounded number of lookups at a time,
    /// preserving watchlist order.
    async fn enrich_entries(&self, entries: Vec<WatchlistEntry>) -> Vec<EnrichedEntry> {
        stream::iter(entries.into_iter().map(|entry| {
            let catalog = Arc::clone(&self.catalog);
            async move {
                let vote_average = match catalog.fetch_by_id(entry.movie_id).await {
                    Ok(movie) => movie.vote_average,
                    Err(err) => {
                        debug!("No rating for movie {}: {}", entry.movie_id, err);
                        None
                    }
                };
                EnrichedEntry { entry, vote_average }
            }
        }))
        .buffered(self.fanout_limit)
        .collect()
        .await
    }

    /// One page of popular movies, unsorted.
    pub async fn browse_page(&self, page: u32) -> Result<Vec<MovieSummary>, ServiceError> {
        self.catalog
            .fetch_popular(page.max(1))
            .await
            .map_err(ServiceError::from_catalog)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, ServiceError> {
        self.catalog
            .search(query)
            .await
            .map_err(ServiceError::from_catalog)
    }

    /// Detail view. The membership flag degrades to `false` when the lookup
    /// fails; the movie itself is still shown.
    pub async fn movie_details(
        &self,
        current: Option<&CurrentUser>,
        movie_id: i64,
    ) -> Result<MovieDetails, ServiceError> {
        let movie = self
            .catalog
            .fetch_by_id(movie_id)
            .await
            .map_err(ServiceError::from_catalog)?;

        let already_added = match current {
            Some(user) => watchlist::is_member(&self.db, &user.id, movie_id)
                .await
                .unwrap_or_else(|err| {
                    warn!("Membership check failed for movie {}: {}", movie_id, err);
                    false
                }),
            None => false,
        };

        Ok(MovieDetails {
            movie,
            already_added,
        })
    }
}

fn sort_movies(mut movies: Vec<MovieSummary>, sort: SortKey) -> Vec<MovieSummary> {
    match sort {
        SortKey::Title => movies.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::Rating => movies.sort_by(|a, b| {
            let ra = a.vote_average.unwrap_or(f64::MIN);
            let rb = b.vote_average.unwrap_or(f64::MIN);
            rb.partial_cmp(&ra).unwrap_or(Ordering::Equal)
        }),
        // Missing dates sort last; sort_by is stable so ties keep catalog order
        SortKey::Year => movies.sort_by(|a, b| b.release_date.cmp(&a.release_date)),
        SortKey::None => {}
    }
    movies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{users, AddToWatchlistRequest, Role};
    use crate::service::testing::{movie, service_with, StubCatalog};

    fn sample_popular() -> Vec<MovieSummary> {
        vec![
            movie(1, "Zodiac", Some(7.7), Some("2007-03-02")),
            movie(2, "Alien", Some(8.5), Some("1979-05-25")),
            movie(3, "Heat", None, None),
            movie(4, "Blade Runner", Some(8.1), Some("1982-06-25")),
        ]
    }

    async fn guest(svc: &WatchlistService, name: &str) -> CurrentUser {
        let user = users::insert(&svc.db, name, "h", Role::Guest).await.unwrap();
        CurrentUser {
            id: user.id,
            role: user.role,
        }
    }

    fn add_req(movie_id: i64) -> AddToWatchlistRequest {
        AddToWatchlistRequest {
            movie_id,
            title: format!("Movie {}", movie_id),
            poster_path: None,
            overview: None,
        }
    }

    #[test]
    fn test_sort_key_parses_leniently() {
        assert_eq!(SortKey::from("title"), SortKey::Title);
        assert_eq!(SortKey::from("rating"), SortKey::Rating);
        assert_eq!(SortKey::from("year"), SortKey::Year);
        assert_eq!(SortKey::from("none"), SortKey::None);
        assert_eq!(SortKey::from("bogus"), SortKey::None);
        assert_eq!(SortKey::from(""), SortKey::None);
    }

    #[test]
    fn test_sort_by_title_is_ascending() {
        let sorted = sort_movies(sample_popular(), SortKey::Title);
        let titles: Vec<&str> = sorted.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Blade Runner", "Heat", "Zodiac"]);
    }

    #[test]
    fn test_sort_by_rating_is_descending_with_missing_last() {
        let sorted = sort_movies(sample_popular(), SortKey::Rating);
        let ids: Vec<i64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);

        let ratings: Vec<Option<f64>> = sorted.iter().map(|m| m.vote_average).collect();
        for pair in ratings.windows(2) {
            let a = pair[0].unwrap_or(f64::MIN);
            let b = pair[1].unwrap_or(f64::MIN);
            assert!(a >= b, "ratings not non-increasing: {:?}", ratings);
        }
    }

    #[test]
    fn test_sort_by_year_is_descending_with_missing_last() {
        let sorted = sort_movies(sample_popular(), SortKey::Year);
        let ids: Vec<i64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_sort_none_keeps_catalog_order() {
        let sorted = sort_movies(sample_popular(), SortKey::None);
        let ids: Vec<i64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dashboard_for_anonymous_caller() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            ..Default::default()
        })
        .await;

        let dashboard = svc.build_dashboard(None, 1, SortKey::None).await;

        assert_eq!(dashboard.browse.len(), 4);
        assert!(dashboard.watchlist.is_empty());
        assert_eq!(dashboard.next_page, 2);
        assert!(dashboard.error.is_none());
    }

    #[tokio::test]
    async fn test_dashboard_enriches_watchlist_in_order() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            ratings: [(10, 6.5), (20, 9.0)].into_iter().collect(),
            ..Default::default()
        })
        .await;
        let user = guest(&svc, "alice").await;

        for id in [10, 20, 30] {
            svc.add_to_watchlist(&user.id, &add_req(id)).await.unwrap();
        }

        let dashboard = svc.build_dashboard(Some(&user), 1, SortKey::None).await;

        let ids: Vec<i64> = dashboard.watchlist.iter().map(|e| e.entry.movie_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(dashboard.watchlist[0].vote_average, Some(6.5));
        assert_eq!(dashboard.watchlist[1].vote_average, Some(9.0));
        // Movie 30 has no rating in the catalog
        assert_eq!(dashboard.watchlist[2].vote_average, None);
        assert!(dashboard.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_rating_lookup_degrades_only_that_entry() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            ratings: [(10, 6.5), (30, 7.0)].into_iter().collect(),
            fail_details_for: vec![20],
            ..Default::default()
        })
        .await;
        let user = guest(&svc, "alice").await;

        for id in [10, 20, 30] {
            svc.add_to_watchlist(&user.id, &add_req(id)).await.unwrap();
        }

        let dashboard = svc.build_dashboard(Some(&user), 1, SortKey::None).await;

        assert_eq!(dashboard.watchlist.len(), 3);
        assert_eq!(dashboard.watchlist[0].vote_average, Some(6.5));
        assert_eq!(dashboard.watchlist[1].vote_average, None);
        assert_eq!(dashboard.watchlist[2].vote_average, Some(7.0));
        // The dashboard itself is healthy
        assert!(dashboard.error.is_none());
        assert_eq!(dashboard.browse.len(), 4);
    }

    #[tokio::test]
    async fn test_catalog_outage_degrades_whole_dashboard() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            fail_popular: true,
            ..Default::default()
        })
        .await;
        let user = guest(&svc, "alice").await;
        svc.add_to_watchlist(&user.id, &add_req(10)).await.unwrap();

        let dashboard = svc.build_dashboard(Some(&user), 1, SortKey::Title).await;

        assert!(dashboard.browse.is_empty());
        assert!(dashboard.watchlist.is_empty());
        assert_eq!(dashboard.error.as_deref(), Some("Could not load content"));
        // Echoes of the request survive for the client to re-render
        assert_eq!(dashboard.sort, SortKey::Title);
        assert_eq!(dashboard.next_page, 2);
    }

    #[tokio::test]
    async fn test_dashboard_page_zero_is_clamped() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            ..Default::default()
        })
        .await;

        let dashboard = svc.build_dashboard(None, 0, SortKey::None).await;
        assert_eq!(dashboard.next_page, 2);
    }

    #[tokio::test]
    async fn test_browse_page_propagates_outage() {
        let svc = service_with(StubCatalog {
            fail_popular: true,
            ..Default::default()
        })
        .await;

        let err = svc.browse_page(1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_search_filters_by_title() {
        let svc = service_with(StubCatalog {
            popular: sample_popular(),
            ..Default::default()
        })
        .await;

        let hits = svc.search("blade").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Blade Runner");
    }

    #[tokio::test]
    async fn test_movie_details_reports_membership() {
        let svc = service_with(StubCatalog {
            ratings: [(42, 8.0)].into_iter().collect(),
            ..Default::default()
        })
        .await;
        let user = guest(&svc, "alice").await;

        let before = svc.movie_details(Some(&user), 42).await.unwrap();
        assert!(!before.already_added);

        svc.add_to_watchlist(&user.id, &add_req(42)).await.unwrap();

        let after = svc.movie_details(Some(&user), 42).await.unwrap();
        assert!(after.already_added);
        assert_eq!(after.movie.vote_average, Some(8.0));

        let anonymous = svc.movie_details(None, 42).await.unwrap();
        assert!(!anonymous.already_added);
    }

    #[tokio::test]
    async fn test_movie_details_not_found() {
        let svc = service_with(StubCatalog {
            fail_details_for: vec![404],
            ..Default::default()
        })
        .await;

        let err = svc.movie_details(None, 404).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_enriched_entry_flattens_in_json() {
        let entry = EnrichedEntry {
            entry: WatchlistEntry {
                id: "e1".to_string(),
                user_id: "u1".to_string(),
                movie_id: 42,
                movie_title: "Blade Runner".to_string(),
                poster_path: None,
                overview: None,
                created_at: "2025-01-01T00:00:00Z".to_string(),
            },
            vote_average: None,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["movie_id"], 42);
        // Absent rating serializes as an explicit null for the client's "N/A"
        assert!(value["vote_average"].is_null());
    }
}
