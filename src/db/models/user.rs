//! User account and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::watchlist::{AddToWatchlistRequest, WatchlistEntry};

/// Account roles. There is no self-service path from guest to admin;
/// promotion is an admin-only operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    /// Can browse the catalog and manage their own watchlist
    Guest,
    /// Can additionally manage accounts via the admin endpoints
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Guest => write!(f, "guest"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

/// User shape returned by the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Movie the user tried to save before being sent to the login form;
    /// it is added to their watchlist once the login succeeds.
    pub pending_add: Option<AddToWatchlistRequest>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_add: Option<crate::service::AddOutcome>,
}

/// Request to create an account via the admin endpoints
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    /// Defaults to guest when omitted
    pub role: Option<Role>,
}

/// Request to rename an account or reset its password
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub password: String,
}

/// Guest account with its watchlist for the admin overview
#[derive(Debug, Clone, Serialize)]
pub struct GuestWithWatchlist {
    pub user: UserResponse,
    pub watchlist: Vec<WatchlistEntry>,
}

/// Admin overview: guests (with watchlists) and admins, listed separately
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
    pub guests: Vec<GuestWithWatchlist>,
    pub admins: Vec<UserResponse>,
}

/// Single account with its watchlist for the admin user-settings view
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub user: UserResponse,
    pub watchlist: Vec<WatchlistEntry>,
}
