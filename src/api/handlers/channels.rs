//! Channel handlers: list tenants, inspect one, force a disconnect.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ChannelListResponse, DisconnectResponse};
use crate::app_state::AppState;
use crate::domain::TenantId;
use crate::error::{ErrorResponse, RelayError};
use crate::service::ChannelSummary;

/// `GET /channels` — List all tenants.
#[utoipa::path(
    get,
    path = "/api/v1/channels",
    tag = "Channels",
    summary = "List channels",
    description = "Returns every tenant with its bridge state and session count.",
    responses(
        (status = 200, description = "Channel list", body = ChannelListResponse),
    )
)]
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    Json(ChannelListResponse::from(state.registry.list().await))
}

/// `GET /channels/{tenant}` — Inspect one tenant.
///
/// # Errors
///
/// Returns [`RelayError`] for a malformed or unknown tenant.
#[utoipa::path(
    get,
    path = "/api/v1/channels/{tenant}",
    tag = "Channels",
    summary = "Get channel",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
    ),
    responses(
        (status = 200, description = "Channel status", body = ChannelSummary),
        (status = 400, description = "Invalid tenant id", body = ErrorResponse),
        (status = 404, description = "Tenant not found", body = ErrorResponse),
    )
)]
pub async fn get_channel(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let tenant = TenantId::parse(&tenant)?;
    let broadcaster = state.registry.get(&tenant).await?;
    Ok(Json(ChannelSummary::of(&broadcaster).await))
}

/// `POST /channels/{tenant}/disconnect` — Disconnect a tenant's bridge.
///
/// Idempotent; sessions stay connected and see "Disconnected from Twitch."
/// if a connection was torn down. A tenant left without viewers is removed.
///
/// # Errors
///
/// Returns [`RelayError`] for a malformed or unknown tenant.
#[utoipa::path(
    post,
    path = "/api/v1/channels/{tenant}/disconnect",
    tag = "Channels",
    summary = "Disconnect channel",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
    ),
    responses(
        (status = 200, description = "Bridge disconnected", body = DisconnectResponse),
        (status = 400, description = "Invalid tenant id", body = ErrorResponse),
        (status = 404, description = "Tenant not found", body = ErrorResponse),
    )
)]
pub async fn disconnect_channel(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let tenant = TenantId::parse(&tenant)?;
    let broadcaster = state.registry.get(&tenant).await?;
    let was_connected = broadcaster.bridge().disconnect().await;
    let released = state.registry.release_if_idle(&tenant).await;
    tracing::info!(%tenant, was_connected, released, "disconnect requested over REST");
    Ok(Json(DisconnectResponse {
        tenant: tenant.to_string(),
        was_connected,
        released,
    }))
}

/// Channel routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/channels/{tenant}", get(get_channel))
        .route("/channels/{tenant}/disconnect", post(disconnect_channel))
}
