//! Admin account-management endpoints.
//!
//! Every route is gated through `require_admin`, so an anonymous caller
//! gets a 401 and a logged-in guest a 403 before any work happens.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Access, Capability, CurrentUser};
use crate::db::{
    AdminOverview, CreateUserRequest, Role, UpdateUserRequest, User, UserDetail, UserResponse,
};
use crate::AppState;

use super::auth::{validate_credentials, MaybeUser};
use super::error::ApiError;

/// Require that the caller is an authenticated admin
fn require_admin(user: Option<&User>) -> Result<(), ApiError> {
    let current = user.map(CurrentUser::from);
    match access::authorize(current.as_ref(), Capability::AdminOnly) {
        Access::Allow => Ok(()),
        Access::Deny(reason) => Err(ApiError::from(reason)),
    }
}

/// Overview of all accounts: guests carry their watchlists, admins are
/// listed bare
pub async fn admin_overview(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<AdminOverview>, ApiError> {
    require_admin(user.as_ref())?;

    let overview = state.service.admin_overview().await?;
    Ok(Json(overview))
}

/// Create an account with an explicit role (defaults to guest)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_admin(user.as_ref())?;
    validate_credentials(&request.username, &request.password)?;

    let role = request.role.unwrap_or(Role::Guest);
    let created = state
        .service
        .create_user(&request.username, &request.password, role)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

/// One account with its watchlist
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    require_admin(user.as_ref())?;

    let detail = state.service.user_detail(&id).await?;
    Ok(Json(detail))
}

/// Change an account's username and password
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(user.as_ref())?;
    validate_credentials(&request.username, &request.password)?;

    let updated = state
        .service
        .update_user(&id, &request.username, &request.password)
        .await?;

    Ok(Json(UserResponse::from(updated)))
}

/// Delete a guest account and everything it owns. Admin accounts refuse
/// with a 403 and are left untouched.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(user.as_ref())?;

    state.service.remove_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Promote a guest to admin. Promoting an admin again is a no-op.
pub async fn promote_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(user.as_ref())?;

    state.service.promote_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
