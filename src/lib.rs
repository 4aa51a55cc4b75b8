pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;

use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins; otherwise the built-in default
/// keeps our own crate at debug and everything else at info.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
