//! Bearer tokens — HS256 JWTs carrying the user id in `sub`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Sign a token for the user, valid for `expiry_days` from `now`.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    now: DateTime<Utc>,
    expiry_days: i64,
) -> Result<String, TokenError> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(expiry_days)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Encode)
}

/// Validate signature and expiry, returning the user id the token was
/// issued for. Every failure collapses to `Invalid` so callers cannot
/// leak which check tripped.
pub fn resolve_token(secret: &str, token: &str) -> Result<Uuid, TokenError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| TokenError::Invalid)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Invalid)
}
