//! HTTP API layer.
//!
//! All routes live under `/api`. Protected routes pass through the
//! middleware stack (auth validator, then access logger) before their
//! handler; registration, login, and the health probe stay outside it.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::{ApiContext, AuthedUser};
