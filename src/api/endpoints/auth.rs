//! Authentication endpoints.
//!
//! `POST /api/auth/register` — Unprotected: create an account
//! `POST /api/auth/login` — Unprotected: exchange credentials for a token
//! `GET /api/auth/me` — Protected: resolve caller identity
//! `PUT /api/auth/updateprofile` — Protected: whitelisted profile mutation

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::auth::{hash_password, issue_token, verify_password};
use crate::db::repository;
use crate::models::{EmergencyContact, Role, User, UserProfile};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    // Role-specific extras accepted at registration; anything else in
    // the body is dropped.
    pub specializations: Option<Vec<String>>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub department: Option<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// `POST /api/auth/register` — create an account and sign a token.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Name is required".into()))?;
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| looks_like_email(e))
        .ok_or_else(|| ApiError::Validation("Valid email required".into()))?;
    let password = request
        .password
        .as_deref()
        .filter(|p| p.len() >= 6)
        .ok_or_else(|| ApiError::Validation("Password must be at least 6 chars".into()))?;
    let role = request
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| ApiError::Validation("Invalid role".into()))?;

    let conn = ctx.open_db()?;
    if repository::get_user_by_email(&conn, email)?.is_some() {
        return Err(ApiError::Validation("Email already registered.".into()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_lowercase(),
        password_hash: hash_password(password, ctx.config.password_iterations),
        role,
        avatar: String::new(),
        is_active: true,
        specializations: request.specializations.unwrap_or_default(),
        license_number: None,
        department: request.department,
        extension: None,
        date_of_birth: request.date_of_birth,
        gender: request.gender,
        blood_group: None,
        phone: request.phone,
        address: None,
        emergency_contact: EmergencyContact::default(),
        supervisor_level: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(err) = repository::insert_user(&conn, &user) {
        // Two concurrent registrations can both pass the lookup; the
        // unique index decides the loser.
        if err.is_unique_violation() {
            return Err(ApiError::Validation("Email already registered.".into()));
        }
        return Err(err.into());
    }

    let token = issue_token(
        &ctx.config.token_secret,
        user.id,
        now,
        ctx.config.token_expiry_days,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user = %user.id, role = %user.role, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            token,
            user: user.profile(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/login` — exchange credentials for a token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| looks_like_email(e))
        .ok_or_else(|| ApiError::Validation("Valid email required".into()))?;
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("Password is required".into()))?;

    let conn = ctx.open_db()?;
    // One rejection message for both unknown email and wrong password.
    let user = repository::get_user_by_email(&conn, email)?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or_else(|| ApiError::Unauthenticated("Invalid email or password.".into()))?;

    let token = issue_token(
        &ctx.config.token_secret,
        user.id,
        Utc::now(),
        ctx.config.token_expiry_days,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        success: true,
        token,
        user: user.profile(),
    }))
}

/// `GET /api/auth/me` — the caller, as resolved by the auth gate.
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let user = repository::get_user(&conn, caller.id)?.ok_or_else(ApiError::user_gone)?;
    Ok(Json(UserResponse {
        success: true,
        user: user.profile(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// `PUT /api/auth/updateprofile` — mutate the whitelisted fields only.
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = repository::ProfilePatch {
        name: request.name,
        phone: request.phone,
        address: request.address,
        emergency_contact: request.emergency_contact,
    };

    let conn = ctx.open_db()?;
    let user =
        repository::update_user_profile(&conn, caller.id, &patch)?.ok_or_else(ApiError::user_gone)?;
    Ok(Json(UserResponse {
        success: true,
        user: user.profile(),
    }))
}

/// Just enough shape checking to catch obvious typos: one `@` with a
/// dotted domain after it.
fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !s.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("asha.verma@clinic.example"));
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("no-at-sign.example"));
        assert!(!looks_like_email("@clinic.example"));
        assert!(!looks_like_email("asha@"));
        assert!(!looks_like_email("asha@nodot"));
        assert!(!looks_like_email("asha@.example"));
        assert!(!looks_like_email("asha verma@clinic.example"));
    }
}
