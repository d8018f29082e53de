//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::TenantId;
use crate::service::ChannelRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tenant registry owning every bridge and session set.
    pub registry: Arc<ChannelRegistry>,
    /// Tenant served by the bare `/ws` endpoint.
    pub default_tenant: TenantId,
}
