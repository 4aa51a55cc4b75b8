//! API endpoint handlers.
//!
//! One module per resource group under `/api`. Handlers stay thin:
//! validate, call into the repository, shape the response envelope.

pub mod assignments;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod moods;
pub mod patients;
pub mod sessions;
pub mod therapists;

use rusqlite::Connection;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::db::repository;
use crate::models::{Role, User};

/// Resolve a client-supplied id to a user holding the expected role.
///
/// Absent, unparseable, unknown, and wrong-role ids all collapse into
/// the same not-found error so the response never reveals which check
/// failed.
pub(super) fn resolve_role_user(
    conn: &Connection,
    raw: Option<&str>,
    role: Role,
    missing: &str,
) -> Result<User, ApiError> {
    let id = raw
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| ApiError::NotFound(missing.to_string()))?;
    repository::get_user(conn, id)?
        .filter(|user| user.role == role)
        .ok_or_else(|| ApiError::NotFound(missing.to_string()))
}
