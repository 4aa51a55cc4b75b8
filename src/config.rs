use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Caseflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_PATH: &str = "caseflow.db";
pub const DEFAULT_TOKEN_EXPIRY_DAYS: i64 = 7;

/// PBKDF2 cost for newly stored credentials.
pub const PASSWORD_ITERATIONS: u32 = 600_000;

pub const ENV_PORT: &str = "CASEFLOW_PORT";
pub const ENV_DB_PATH: &str = "CASEFLOW_DB";
pub const ENV_TOKEN_SECRET: &str = "CASEFLOW_TOKEN_SECRET";
pub const ENV_TOKEN_EXPIRY_DAYS: &str = "CASEFLOW_TOKEN_EXPIRY_DAYS";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,caseflow=debug".into()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("{var} has invalid value {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub token_secret: String,
    pub token_expiry_days: i64,
    pub password_iterations: u32,
}

impl AppConfig {
    /// Read configuration from the environment. The token secret has no
    /// default: refusing to start beats signing with a guessable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token_secret = get(ENV_TOKEN_SECRET)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ENV_TOKEN_SECRET))?;

        let port = match get(ENV_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                var: ENV_PORT,
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let db_path = get(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let token_expiry_days = match get(ENV_TOKEN_EXPIRY_DAYS) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days >= 1)
                .ok_or(ConfigError::InvalidVar {
                    var: ENV_TOKEN_EXPIRY_DAYS,
                    value: raw,
                })?,
            None => DEFAULT_TOKEN_EXPIRY_DAYS,
        };

        Ok(Self {
            port,
            db_path,
            token_secret,
            token_expiry_days,
            password_iterations: PASSWORD_ITERATIONS,
        })
    }
}
