//! Account lifecycle: registration, login, and the admin-only operations.

use futures::{stream, StreamExt};
use tracing::{info, warn};

use crate::api::auth::{hash_password, verify_password};
use crate::api::metrics::record_login;
use crate::db::{
    users, watchlist, AddToWatchlistRequest, AdminOverview, GuestWithWatchlist, Role, User,
    UserDetail, UserResponse,
};

use super::{is_unique_violation, AddOutcome, ServiceError, WatchlistService};

/// A successful login, with the outcome of the movie the user tried to save
/// before being sent to the login form (if any).
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub pending_add: Option<AddOutcome>,
}

impl WatchlistService {
    /// Self-service registration. New accounts are always guests.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        self.create_account(username, password, Role::Guest).await
    }

    /// Admin-driven account creation with an explicit role.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        self.create_account(username, password, role).await
    }

    async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        if users::find_by_username(&self.db, username).await?.is_some() {
            return Err(ServiceError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = hash_password(password)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;

        let user = match users::insert(&self.db, username, &password_hash, role).await {
            Ok(user) => user,
            // Lost the race against a concurrent registration of the same name
            Err(err) if is_unique_violation(&err) => {
                return Err(ServiceError::Conflict("Username is already taken".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        info!("Created {} account '{}'", user.role, user.username);
        Ok(user)
    }

    /// Verify credentials. Unknown usernames and wrong passwords are the
    /// same failure to the caller.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        pending: Option<AddToWatchlistRequest>,
    ) -> Result<LoginOutcome, ServiceError> {
        let user = match users::find_by_username(&self.db, username).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                record_login(false);
                return Err(ServiceError::Unauthorized);
            }
        };
        record_login(true);

        let pending_add = match pending {
            Some(req) => Some(self.add_to_watchlist(&user.id, &req).await?),
            None => None,
        };

        Ok(LoginOutcome { user, pending_add })
    }

    /// Rename an account or reset its password. Used by the admin
    /// user-settings screen and by self-service profile edits.
    pub async fn update_user(
        &self,
        id: &str,
        username: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        if let Some(existing) = users::find_by_username(&self.db, username).await? {
            if existing.id != id {
                return Err(ServiceError::Conflict("Username is already taken".to_string()));
            }
        }

        let password_hash = hash_password(password)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;

        let touched = match users::update_profile(&self.db, id, username, &password_hash).await {
            Ok(touched) => touched,
            Err(err) if is_unique_violation(&err) => {
                return Err(ServiceError::Conflict("Username is already taken".to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if touched == 0 {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }

        users::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Delete a guest account and everything attached to it. Admin accounts
    /// cannot be removed, only edited.
    pub async fn remove_user(&self, id: &str) -> Result<(), ServiceError> {
        let user = users::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if user.role.is_admin() {
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be removed".to_string(),
            ));
        }

        users::delete_cascading(&self.db, id).await?;
        info!("Removed account '{}' and its watchlist", user.username);
        Ok(())
    }

    /// Promote a guest to admin. Promoting an admin again changes nothing.
    /// The reverse direction does not exist.
    pub async fn promote_user(&self, id: &str) -> Result<(), ServiceError> {
        let touched = users::set_role(&self.db, id, Role::Admin).await?;
        if touched == 0 {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Guests with their watchlists, plus the list of admins. A watchlist
    /// that fails to load shows up empty instead of failing the overview.
    pub async fn admin_overview(&self) -> Result<AdminOverview, ServiceError> {
        let all = users::list_all(&self.db).await?;
        let (guests, admins): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|u| !u.role.is_admin());

        let guests = stream::iter(guests.into_iter().map(|user| {
            let db = self.db.clone();
            async move {
                let watchlist = watchlist::list_by_user(&db, &user.id)
                    .await
                    .unwrap_or_else(|err| {
                        warn!("Failed to load watchlist for '{}': {}", user.username, err);
                        Vec::new()
                    });
                GuestWithWatchlist {
                    user: user.into(),
                    watchlist,
                }
            }
        }))
        .buffered(self.fanout_limit)
        .collect::<Vec<_>>()
        .await;

        Ok(AdminOverview {
            guests,
            admins: admins.into_iter().map(UserResponse::from).collect(),
        })
    }

    pub async fn user_detail(&self, id: &str) -> Result<UserDetail, ServiceError> {
        let user = users::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        let watchlist = watchlist::list_by_user(&self.db, &user.id).await?;
        Ok(UserDetail {
            user: user.into(),
            watchlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::test_service;

    fn add_req(movie_id: i64) -> AddToWatchlistRequest {
        AddToWatchlistRequest {
            movie_id,
            title: format!("Movie {}", movie_id),
            poster_path: None,
            overview: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let svc = test_service().await;

        let user = svc.register("alice", "opensesame").await.unwrap();
        assert_eq!(user.role, Role::Guest);
        assert_ne!(user.password_hash, "opensesame");

        let outcome = svc.login("alice", "opensesame", None).await.unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert!(outcome.pending_add.is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let svc = test_service().await;

        svc.register("alice", "opensesame").await.unwrap();
        let err = svc.register("alice", "different").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        assert_eq!(users::count(&svc.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_yields_single_account() {
        let svc = test_service().await;

        let (a, b) = tokio::join!(
            svc.register("alice", "password-one"),
            svc.register("alice", "password-two")
        );

        assert!(a.is_ok() != b.is_ok(), "exactly one registration wins");
        let err = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(users::count(&svc.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let svc = test_service().await;
        svc.register("alice", "opensesame").await.unwrap();

        let wrong = svc.login("alice", "wrong", None).await.unwrap_err();
        assert!(matches!(wrong, ServiceError::Unauthorized));

        let unknown = svc.login("nobody", "opensesame", None).await.unwrap_err();
        assert!(matches!(unknown, ServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_login_executes_pending_add() {
        let svc = test_service().await;
        svc.register("alice", "opensesame").await.unwrap();

        let outcome = svc
            .login("alice", "opensesame", Some(add_req(42)))
            .await
            .unwrap();
        assert!(matches!(outcome.pending_add, Some(AddOutcome::Added { .. })));

        // Replaying the same login request adds nothing new
        let replay = svc
            .login("alice", "opensesame", Some(add_req(42)))
            .await
            .unwrap();
        assert_eq!(replay.pending_add, Some(AddOutcome::AlreadyPresent));
        assert_eq!(svc.watchlist_for(&outcome.user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_login_does_not_execute_pending_add() {
        let svc = test_service().await;
        let user = svc.register("alice", "opensesame").await.unwrap();

        let err = svc.login("alice", "wrong", Some(add_req(42))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
        assert!(svc.watchlist_for(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_user_with_role() {
        let svc = test_service().await;

        let admin = svc.create_user("root", "opensesame", Role::Admin).await.unwrap();
        assert_eq!(admin.role, Role::Admin);

        let err = svc
            .create_user("root", "other", Role::Guest)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_user_rename_and_conflicts() {
        let svc = test_service().await;
        let alice = svc.register("alice", "opensesame").await.unwrap();
        svc.register("bob", "opensesame").await.unwrap();

        let renamed = svc.update_user(&alice.id, "alicia", "newpassword").await.unwrap();
        assert_eq!(renamed.username, "alicia");
        svc.login("alicia", "newpassword", None).await.unwrap();

        // Taking bob's name is a conflict
        let err = svc.update_user(&alice.id, "bob", "newpassword").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Keeping your own name is not
        svc.update_user(&alice.id, "alicia", "anotherpass").await.unwrap();

        let missing = svc.update_user("no-such-id", "zed", "password").await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_user_cascades() {
        let svc = test_service().await;
        let doomed = svc.register("doomed", "opensesame").await.unwrap();
        svc.add_to_watchlist(&doomed.id, &add_req(1)).await.unwrap();
        svc.add_to_watchlist(&doomed.id, &add_req(2)).await.unwrap();

        svc.remove_user(&doomed.id).await.unwrap();

        assert!(users::find_by_id(&svc.db, &doomed.id).await.unwrap().is_none());
        assert!(svc.watchlist_for(&doomed.id).await.unwrap().is_empty());

        let missing = svc.remove_user(&doomed.id).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_admin_is_forbidden_and_changes_nothing() {
        let svc = test_service().await;
        let admin = svc.create_user("root", "opensesame", Role::Admin).await.unwrap();
        svc.add_to_watchlist(&admin.id, &add_req(1)).await.unwrap();

        let err = svc.remove_user(&admin.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        // Account and watchlist are intact
        assert!(users::find_by_id(&svc.db, &admin.id).await.unwrap().is_some());
        assert_eq!(svc.watchlist_for(&admin.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_promote_is_idempotent() {
        let svc = test_service().await;
        let alice = svc.register("alice", "opensesame").await.unwrap();

        svc.promote_user(&alice.id).await.unwrap();
        svc.promote_user(&alice.id).await.unwrap();

        let promoted = users::find_by_id(&svc.db, &alice.id).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let missing = svc.promote_user("no-such-id").await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_overview_partitions_roles() {
        let svc = test_service().await;
        svc.create_user("root", "opensesame", Role::Admin).await.unwrap();
        let alice = svc.register("alice", "opensesame").await.unwrap();
        svc.register("bob", "opensesame").await.unwrap();
        svc.add_to_watchlist(&alice.id, &add_req(42)).await.unwrap();

        let overview = svc.admin_overview().await.unwrap();

        assert_eq!(overview.admins.len(), 1);
        assert_eq!(overview.admins[0].username, "root");

        assert_eq!(overview.guests.len(), 2);
        // list_all orders by username, so alice comes first
        assert_eq!(overview.guests[0].user.username, "alice");
        assert_eq!(overview.guests[0].watchlist.len(), 1);
        assert_eq!(overview.guests[1].user.username, "bob");
        assert!(overview.guests[1].watchlist.is_empty());
    }

    #[tokio::test]
    async fn test_admin_overview_survives_unreadable_watchlists() {
        let svc = test_service().await;
        let alice = svc.register("alice", "opensesame").await.unwrap();
        svc.add_to_watchlist(&alice.id, &add_req(42)).await.unwrap();

        // Break watchlist reads out from under the overview
        sqlx::query("DROP TABLE watchlist")
            .execute(&svc.db)
            .await
            .unwrap();

        let overview = svc.admin_overview().await.unwrap();
        assert_eq!(overview.guests.len(), 1);
        assert!(overview.guests[0].watchlist.is_empty());
    }

    #[tokio::test]
    async fn test_user_detail() {
        let svc = test_service().await;
        let alice = svc.register("alice", "opensesame").await.unwrap();
        svc.add_to_watchlist(&alice.id, &add_req(42)).await.unwrap();

        let detail = svc.user_detail(&alice.id).await.unwrap();
        assert_eq!(detail.user.username, "alice");
        assert_eq!(detail.watchlist.len(), 1);

        let missing = svc.user_detail("no-such-id").await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }
}
