//! System endpoints: liveness ping and health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Fixed body returned by the liveness ping.
pub const PONG: &str = "PONG";

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Tenants currently held by the registry.
    pub tenants: usize,
    /// Server time, RFC 3339.
    pub checked_at: String,
}

/// `GET /ping/pong` — Connectivity check between front-end and back-end.
#[utoipa::path(
    get,
    path = "/ping/pong",
    tag = "System",
    summary = "Liveness ping",
    description = "Always answers `PONG`, independent of any bridge state.",
    responses(
        (status = 200, description = "Service is reachable", body = String, content_type = "text/plain"),
    )
)]
pub async fn pong_handler() -> impl IntoResponse {
    (StatusCode::OK, PONG)
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Reports liveness, crate version and the number of live tenants.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tenants: state.registry.len().await,
        checked_at: Utc::now().to_rfc3339(),
    })
}

/// Root-level routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping/pong", get(pong_handler))
        .route("/health", get(health_handler))
}
