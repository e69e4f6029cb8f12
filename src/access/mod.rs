//! Capability checks.
//!
//! Every operation is classified as public, login-required, or admin-only,
//! and the decision is a pure function of who is calling. Handlers translate
//! a deny into the HTTP response; nothing here touches the database.

use serde::Serialize;

use crate::db::{Role, User};

/// The identity attached to a request, resolved by the auth layer.
/// Anonymous callers are represented as `None` at the call sites, never as
/// a sentinel user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
        }
    }
}

/// How much authentication an operation demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Anyone, signed in or not
    Public,
    /// Any signed-in account
    AuthenticatedOnly,
    /// Signed-in admins only
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

/// Why a caller was turned away. Opaque codes only; the response never
/// explains what would have been required to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    LoginRequired,
    AdminRequired,
}

pub fn authorize(user: Option<&CurrentUser>, capability: Capability) -> Access {
    match capability {
        Capability::Public => Access::Allow,
        Capability::AuthenticatedOnly => match user {
            Some(_) => Access::Allow,
            None => Access::Deny(DenyReason::LoginRequired),
        },
        Capability::AdminOnly => match user {
            Some(current) if current.role.is_admin() => Access::Allow,
            Some(_) => Access::Deny(DenyReason::AdminRequired),
            None => Access::Deny(DenyReason::LoginRequired),
        },
    }
}
