//! API error types with the wire shape clients rely on:
//! `{ "success": false, "message": "..." }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::Role;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Patient already has an active assignment. Transfer or end current assignment first.")]
    ConflictActiveAssignment,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Request carried no usable bearer token.
    pub fn not_logged_in() -> Self {
        Self::Unauthenticated("Not authorized. Please log in.".into())
    }

    /// Token failed signature or expiry checks.
    pub fn invalid_token() -> Self {
        Self::Unauthenticated("Invalid token.".into())
    }

    /// Token was valid but its user no longer resolves.
    pub fn user_gone() -> Self {
        Self::Unauthenticated("User not found.".into())
    }

    pub fn role_forbidden(role: Role) -> Self {
        Self::Forbidden(format!("Role '{role}' is not authorized for this action."))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::ConflictActiveAssignment => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(detail, "request failed");
                "Server error.".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
