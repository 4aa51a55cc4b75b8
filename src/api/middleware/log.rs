//! Access logging middleware.
//!
//! Logs every request with method, path, response status, and the
//! caller when auth has already injected one. Runs innermost so
//! `AuthedUser` is present on protected routes.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::AuthedUser;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let caller = req
        .extensions()
        .get::<AuthedUser>()
        .map(|u| format!("{}:{}", u.role, u.id));

    let response = next.run(req).await;

    let status = response.status().as_u16();
    match caller {
        Some(caller) => tracing::info!(%method, %path, status, %caller, "request"),
        None => tracing::info!(%method, %path, status, "request"),
    }
    response
}
