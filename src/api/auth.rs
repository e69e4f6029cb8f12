use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::access::DenyReason;
use crate::db::{
    DbPool, LoginRequest, LoginResponse, RegisterRequest, Role, Session, UpdateUserRequest, User,
    UserResponse,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_password, validate_username};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a username/password pair, collecting per-field errors
pub(super) fn validate_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_username(username) {
        errors.add("username", &e);
    }
    if let Err(e) = validate_password(password) {
        errors.add("password", &e);
    }

    errors.finish()
}

/// Persist a new session row; the caller keeps the raw token
async fn store_session(
    pool: &DbPool,
    user_id: &str,
    token: &str,
    ttl_days: i64,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now();
    let expires_at = (now + chrono::Duration::days(ttl_days)).to_rfc3339();

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(hash_token(token))
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mint a bearer token for the given account and record its session
async fn issue_session(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let token = generate_token();
    store_session(
        &state.db,
        user_id,
        &token,
        state.config.auth.session_ttl_days,
    )
    .await?;
    Ok(token)
}

/// Self-service signup. New accounts are always guests and come back
/// logged in, so the client never needs a second round trip.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    validate_credentials(&request.username, &request.password)?;

    let user = state
        .service
        .register(&request.username, &request.password)
        .await?;
    let token = issue_session(&state, &user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
            pending_add: None,
        }),
    ))
}

/// Login endpoint. A `pending_add` carried in the request is applied to
/// the caller's watchlist once the credentials check out.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .service
        .login(&request.username, &request.password, request.pending_add)
        .await?;
    let token = issue_session(&state, &outcome.user.id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(outcome.user),
        pending_add: outcome.pending_add,
    }))
}

/// Revoke the presented session. Unknown or absent tokens still get a
/// 204 so logout stays idempotent.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = extract_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Return the calling account
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Let the caller change their own username and password
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_credentials(&request.username, &request.password)?;

    let updated = state
        .service
        .update_user(&user.id, &request.username, &request.password)
        .await?;

    Ok(Json(UserResponse::from(updated)))
}

/// Extract the token from request headers
fn extract_token(headers: &HeaderMap) -> Option<String> {
    // Try Authorization header first
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if auth_header.starts_with("Bearer ") {
            return Some(auth_header[7..].to_string());
        }
    }

    // Fall back to X-API-Key header
    headers
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Resolve a bearer token to an account, or `None` when no live session
/// matches. The configured admin token authenticates as a synthetic
/// system admin without touching the session table.
pub async fn get_current_user(
    pool: &DbPool,
    config: &crate::config::Config,
    token: &str,
) -> Result<Option<User>, ApiError> {
    // Constant-time comparison to prevent timing attacks; an unset admin
    // token must never match anything.
    let admin_token = config.auth.admin_token.as_bytes();
    let provided = token.as_bytes();
    if !admin_token.is_empty()
        && admin_token.len() == provided.len()
        && admin_token.ct_eq(provided).into()
    {
        let now = chrono::Utc::now().to_rfc3339();
        return Ok(Some(User {
            id: "system".to_string(),
            username: "system".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            created_at: now.clone(),
            updated_at: now,
        }));
    }

    // Look up session and user
    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_token(&parts.headers).ok_or_else(|| ApiError::from(DenyReason::LoginRequired))?;
        get_current_user(&state.db, &state.config, &token)
            .await?
            .ok_or_else(|| ApiError::from(DenyReason::LoginRequired))
    }
}

/// Extractor that resolves the caller when a live session is presented
/// and yields `None` otherwise. Stale tokens browse as anonymous rather
/// than failing the whole request.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };

        let user = get_current_user(&state.db, &state.config, &token).await?;
        Ok(MaybeUser(user))
    }
}
