use std::process::ExitCode;

use caseflow::api::{start_server, ApiContext};
use caseflow::config::{AppConfig, APP_NAME, APP_VERSION};
use caseflow::db::sqlite::open_database;
use caseflow::seed::seed_demo_data;

#[tokio::main]
async fn main() -> ExitCode {
    caseflow::init_tracing();
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if std::env::args().any(|arg| arg == "--seed") {
        let result = open_database(&config.db_path)
            .and_then(|conn| seed_demo_data(&conn, config.password_iterations));
        if let Err(e) = result {
            tracing::error!("seeding failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    let server = match start_server(ApiContext::new(config)).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on http://{}", server.addr);

    shutdown_signal().await;
    tracing::info!("shutting down");
    server.shutdown_and_wait().await;

    ExitCode::SUCCESS
}

/// Resolves on Ctrl-C, or on SIGTERM where that exists.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
