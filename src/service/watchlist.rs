//! Watchlist membership operations.

use serde::Serialize;
use tracing::debug;

use crate::api::metrics::record_watchlist_add;
use crate::db::{watchlist, AddToWatchlistRequest, WatchlistEntry};

use super::{is_unique_violation, ServiceError, WatchlistService};

/// Result of an add. Adding a movie that is already on the list is a normal
/// outcome, not an error, so retries and double-clicks stay harmless.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    Added { entry: WatchlistEntry },
    AlreadyPresent,
}

/// Removal always reports `Removed`; there is nothing useful to tell a
/// caller whose entry was already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
}

impl WatchlistService {
    pub async fn add_to_watchlist(
        &self,
        user_id: &str,
        req: &AddToWatchlistRequest,
    ) -> Result<AddOutcome, ServiceError> {
        if watchlist::is_member(&self.db, user_id, req.movie_id).await? {
            record_watchlist_add(false);
            return Ok(AddOutcome::AlreadyPresent);
        }

        match watchlist::insert(&self.db, user_id, req).await {
            Ok(entry) => {
                debug!("Added movie {} for user {}", req.movie_id, user_id);
                record_watchlist_add(true);
                Ok(AddOutcome::Added { entry })
            }
            // Lost the race against a concurrent add of the same movie
            Err(err) if is_unique_violation(&err) => {
                record_watchlist_add(false);
                Ok(AddOutcome::AlreadyPresent)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove one of the caller's entries. Ids that are missing or belong to
    /// another account leave the store untouched.
    pub async fn remove_from_watchlist(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<RemoveOutcome, ServiceError> {
        let touched = watchlist::remove(&self.db, entry_id, user_id).await?;
        if touched == 0 {
            debug!("Watchlist entry {} was already gone for user {}", entry_id, user_id);
        }
        Ok(RemoveOutcome::Removed)
    }

    pub async fn watchlist_for(&self, user_id: &str) -> Result<Vec<WatchlistEntry>, ServiceError> {
        Ok(watchlist::list_by_user(&self.db, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::test_service;

    fn req(movie_id: i64, title: &str) -> AddToWatchlistRequest {
        AddToWatchlistRequest {
            movie_id,
            title: title.to_string(),
            poster_path: None,
            overview: None,
        }
    }

    #[tokio::test]
    async fn test_add_then_duplicate_add() {
        let svc = test_service().await;
        let user = crate::db::users::insert(&svc.db, "alice", "h", crate::db::Role::Guest)
            .await
            .unwrap();

        let first = svc.add_to_watchlist(&user.id, &req(42, "Blade Runner")).await.unwrap();
        let AddOutcome::Added { entry } = first else {
            panic!("expected Added, got {:?}", first);
        };
        assert_eq!(entry.movie_id, 42);

        let second = svc.add_to_watchlist(&user.id, &req(42, "Blade Runner")).await.unwrap();
        assert_eq!(second, AddOutcome::AlreadyPresent);

        assert_eq!(svc.watchlist_for(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_one_row() {
        let svc = test_service().await;
        let user = crate::db::users::insert(&svc.db, "alice", "h", crate::db::Role::Guest)
            .await
            .unwrap();

        let req_a = req(42, "Blade Runner");
        let req_b = req(42, "Blade Runner");
        let (a, b) = tokio::join!(
            svc.add_to_watchlist(&user.id, &req_a),
            svc.add_to_watchlist(&user.id, &req_b)
        );

        let outcomes = [a.unwrap(), b.unwrap()];
        let added = outcomes
            .iter()
            .filter(|o| matches!(o, AddOutcome::Added { .. }))
            .count();
        assert_eq!(added, 1, "exactly one add wins: {:?}", outcomes);
        assert_eq!(svc.watchlist_for(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let svc = test_service().await;
        let user = crate::db::users::insert(&svc.db, "alice", "h", crate::db::Role::Guest)
            .await
            .unwrap();

        let added = svc.add_to_watchlist(&user.id, &req(42, "Blade Runner")).await.unwrap();
        let AddOutcome::Added { entry } = added else {
            panic!("expected Added");
        };

        assert_eq!(
            svc.remove_from_watchlist(&user.id, &entry.id).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(
            svc.remove_from_watchlist(&user.id, &entry.id).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert!(svc.watchlist_for(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_does_not_touch_other_accounts() {
        let svc = test_service().await;
        let alice = crate::db::users::insert(&svc.db, "alice", "h", crate::db::Role::Guest)
            .await
            .unwrap();
        let bob = crate::db::users::insert(&svc.db, "bob", "h", crate::db::Role::Guest)
            .await
            .unwrap();

        let added = svc.add_to_watchlist(&alice.id, &req(42, "Blade Runner")).await.unwrap();
        let AddOutcome::Added { entry } = added else {
            panic!("expected Added");
        };

        // Bob asking to delete Alice's entry silently does nothing
        assert_eq!(
            svc.remove_from_watchlist(&bob.id, &entry.id).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(svc.watchlist_for(&alice.id).await.unwrap().len(), 1);
    }

    #[test]
    fn test_outcomes_serialize_with_status_tag() {
        let removed = serde_json::to_value(RemoveOutcome::Removed).unwrap();
        assert_eq!(removed["status"], "removed");

        let already = serde_json::to_value(AddOutcome::AlreadyPresent).unwrap();
        assert_eq!(already["status"], "already_present");
    }
}
