//! Seed data inserted on startup.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::hash_password;
use crate::config::AuthConfig;

use super::{users, DbPool, Role};

/// Create the initial admin account when the users table is empty.
///
/// Uses the configured credentials when present; otherwise generates a
/// one-time password and logs it so the operator can sign in.
pub async fn seed_default_admin(pool: &DbPool, auth: &AuthConfig) -> Result<()> {
    if users::count(pool).await? > 0 {
        return Ok(());
    }

    let generated;
    let password = match &auth.admin_password {
        Some(password) => password.as_str(),
        None => {
            generated = Uuid::new_v4().to_string();
            info!(
                "Generated admin password for '{}': {}",
                auth.admin_username, generated
            );
            generated.as_str()
        }
    };

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    users::insert(pool, &auth.admin_username, &password_hash, Role::Admin).await?;

    info!("Seeded admin account '{}'", auth.admin_username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            admin_token: "test-token".to_string(),
            admin_username: "admin".to_string(),
            admin_password: Some("correct horse battery".to_string()),
            session_ttl_days: 7,
        }
    }

    #[tokio::test]
    async fn test_seeds_admin_into_empty_database() {
        let pool = db::test_pool().await;

        seed_default_admin(&pool, &auth_config()).await.unwrap();

        let admin = users::find_by_username(&pool, "admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(users::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seeding_twice_is_a_noop() {
        let pool = db::test_pool().await;

        seed_default_admin(&pool, &auth_config()).await.unwrap();
        seed_default_admin(&pool, &auth_config()).await.unwrap();

        assert_eq!(users::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_skips_populated_database() {
        let pool = db::test_pool().await;
        users::insert(&pool, "existing", "h", Role::Guest).await.unwrap();

        seed_default_admin(&pool, &auth_config()).await.unwrap();

        assert!(users::find_by_username(&pool, "admin").await.unwrap().is_none());
        assert_eq!(users::count(&pool).await.unwrap(), 1);
    }
}
