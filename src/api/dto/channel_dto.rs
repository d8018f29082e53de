//! Channel (tenant) DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::service::ChannelSummary;

/// Response body for `GET /api/v1/channels`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelListResponse {
    /// One entry per tenant, sorted by tenant id.
    pub channels: Vec<ChannelSummary>,
    /// Number of tenants.
    pub total: usize,
}

impl From<Vec<ChannelSummary>> for ChannelListResponse {
    fn from(channels: Vec<ChannelSummary>) -> Self {
        let total = channels.len();
        Self { channels, total }
    }
}

/// Response body for `POST /api/v1/channels/{tenant}/disconnect`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DisconnectResponse {
    /// Tenant identifier.
    pub tenant: String,
    /// `false` if the bridge was already disconnected.
    pub was_connected: bool,
    /// `true` if the tenant had no viewers left and was removed.
    pub released: bool,
}
