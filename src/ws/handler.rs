//! Axum WebSocket upgrade handlers.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::{SessionId, TenantId};
use crate::error::RelayError;

/// `GET /ws` — Upgrade to a viewer socket on the default tenant.
///
/// # Errors
///
/// Returns [`RelayError::TenantLimitReached`] if the default tenant does
/// not exist yet and the registry is full.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let tenant = state.default_tenant.clone();
    upgrade(ws, state, tenant).await
}

/// `GET /ws/{tenant}` — Upgrade to a viewer socket on a named tenant.
///
/// # Errors
///
/// Returns [`RelayError::InvalidTenant`] for a malformed tenant id and
/// [`RelayError::TenantLimitReached`] if the registry is full.
pub async fn tenant_ws_handler(
    ws: WebSocketUpgrade,
    Path(tenant): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let tenant = TenantId::parse(&tenant)?;
    upgrade(ws, state, tenant).await
}

async fn upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    tenant: TenantId,
) -> Result<impl IntoResponse, RelayError> {
    let (broadcaster, session) = state.registry.join(&tenant, SessionId::new()).await?;
    let registry = Arc::clone(&state.registry);
    Ok(ws.on_upgrade(move |socket| run_connection(socket, broadcaster, session, registry)))
}
