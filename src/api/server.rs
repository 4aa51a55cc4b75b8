//! HTTP server lifecycle.
//!
//! Binds the configured address, mounts [`api_router`], and serves in
//! a background task. Callers keep an [`ApiServer`] handle: dropping
//! the handle leaves the server running, `shutdown` drains it.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Signal shutdown and wait for in-flight requests to drain.
    pub async fn shutdown_and_wait(mut self) {
        self.shutdown();
        let _ = self.task.await;
    }
}

/// Start the server on the configured port, all interfaces.
pub async fn start_server(ctx: ApiContext) -> Result<ApiServer, String> {
    let port = ctx.config.port;
    start_server_on(ctx, SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
}

/// Start the server on a specific address. Port 0 binds an ephemeral
/// port; the handle carries the resolved address.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, String> {
    // Open once up front so schema problems surface at startup instead
    // of on the first request.
    ctx.open_db()
        .map_err(|e| format!("Database not usable: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to resolve bound address: {e}"))?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
