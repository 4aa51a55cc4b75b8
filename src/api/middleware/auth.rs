//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves the user the
//! token was issued for, and injects `AuthedUser` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::auth::resolve_token;
use crate::db::repository;
use crate::models::Role;

/// Require a valid bearer token for an active user.
///
/// Accesses `ApiContext` from request extensions (injected by the
/// Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(ApiError::not_logged_in)?
        .to_string();

    let user_id = resolve_token(&ctx.config.token_secret, &token)
        .map_err(|_| ApiError::invalid_token())?;

    let conn = ctx.open_db()?;
    let user = repository::get_user(&conn, user_id)?.ok_or_else(ApiError::user_gone)?;
    // Deactivated accounts keep their rows but lose API access.
    if !user.is_active {
        return Err(ApiError::user_gone());
    }

    req.extensions_mut().insert(AuthedUser {
        id: user.id,
        role: user.role,
        name: user.name,
    });

    Ok(next.run(req).await)
}

/// Gate an already-authenticated caller on role.
pub fn require_role(user: &AuthedUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::role_forbidden(user.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn caller(role: Role) -> AuthedUser {
        AuthedUser {
            id: Uuid::new_v4(),
            role,
            name: "Test Caller".into(),
        }
    }

    #[test]
    fn require_role_admits_listed_roles_only() {
        let supervisor = caller(Role::Supervisor);
        assert!(require_role(&supervisor, &[Role::Supervisor]).is_ok());
        assert!(require_role(&supervisor, &[Role::Therapist, Role::Supervisor]).is_ok());

        let patient = caller(Role::Patient);
        let err = require_role(&patient, &[Role::Supervisor]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Role 'patient' is not authorized for this action."
        );
    }
}
