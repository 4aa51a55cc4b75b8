//! Shared types for the API layer.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::sqlite::open_database;
use crate::db::DatabaseError;
use crate::models::Role;

/// Shared context for all API routes and middleware. Each handler
/// opens its own connection, so the context stays cheaply cloneable
/// and never holds a lock across awaits.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        open_database(&self.config.db_path)
    }
}

/// Authenticated caller, injected into request extensions by the auth
/// middleware after token validation resolved an active user.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
}
