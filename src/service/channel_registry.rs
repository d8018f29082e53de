//! Registry of tenants, each with its own broadcaster and chat bridge.
//!
//! [`ChannelRegistry`] replaces a process-wide bot singleton: every tenant
//! key maps to an independent [`Broadcaster`], so several channels can be
//! relayed side by side without shared mutable state between them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::broadcaster::{Broadcaster, BroadcasterSettings};
use crate::domain::{ConnectionState, Session, SessionId, TenantId};
use crate::error::RelayError;
use crate::transport::Connector;

/// Lightweight summary of one tenant for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChannelSummary {
    /// Tenant identifier.
    pub tenant: String,
    /// Bridge connection state.
    pub state: ConnectionState,
    /// Twitch channel of the current or most recent connection.
    pub channel: Option<String>,
    /// Number of connected viewer sessions.
    pub session_count: usize,
}

impl ChannelSummary {
    /// Builds a summary by querying `broadcaster`.
    pub async fn of(broadcaster: &Broadcaster) -> Self {
        let status = broadcaster.status().await;
        Self {
            tenant: broadcaster.tenant().to_string(),
            state: status.state,
            channel: status.channel,
            session_count: broadcaster.session_count(),
        }
    }
}

/// Central store for all active tenants.
///
/// # Concurrency
///
/// The outer map sits behind a [`tokio::sync::RwLock`]; each
/// [`Broadcaster`] serializes its own state, so tenants never contend with
/// each other beyond map lookups.
#[derive(Debug)]
pub struct ChannelRegistry {
    connector: Arc<dyn Connector>,
    settings: BroadcasterSettings,
    max_tenants: usize,
    channels: RwLock<HashMap<TenantId, Arc<Broadcaster>>>,
}

impl ChannelRegistry {
    /// Creates an empty registry. `max_tenants == 0` means unlimited.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, settings: BroadcasterSettings, max_tenants: usize) -> Self {
        Self {
            connector,
            settings,
            max_tenants,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the broadcaster for `tenant`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TenantLimitReached`] if the tenant is new and
    /// the registry is full even after idle tenants were evicted.
    pub async fn get_or_create(&self, tenant: &TenantId) -> Result<Arc<Broadcaster>, RelayError> {
        if let Some(existing) = self.channels.read().await.get(tenant) {
            return Ok(Arc::clone(existing));
        }

        let mut map = self.channels.write().await;
        self.entry(&mut map, tenant).await
    }

    /// Registers viewer session `session_id` on `tenant`, creating the
    /// tenant on first use.
    ///
    /// Lookup and registration happen under the map's write lock, so a
    /// concurrent [`Self::release_if_idle`] can never drop the broadcaster
    /// between the two.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TenantLimitReached`] if the tenant is new and
    /// the registry is full even after idle tenants were evicted.
    pub async fn join(
        &self,
        tenant: &TenantId,
        session_id: SessionId,
    ) -> Result<(Arc<Broadcaster>, Session), RelayError> {
        let mut map = self.channels.write().await;
        let broadcaster = self.entry(&mut map, tenant).await?;
        let session = broadcaster.register_session(session_id);
        Ok((broadcaster, session))
    }

    async fn entry(
        &self,
        map: &mut HashMap<TenantId, Arc<Broadcaster>>,
        tenant: &TenantId,
    ) -> Result<Arc<Broadcaster>, RelayError> {
        if let Some(existing) = map.get(tenant) {
            return Ok(Arc::clone(existing));
        }
        if self.max_tenants > 0 && map.len() >= self.max_tenants {
            let evicted = evict_idle(map).await;
            if evicted > 0 {
                tracing::info!(evicted, "idle tenants evicted at tenant limit");
            }
            if map.len() >= self.max_tenants {
                return Err(RelayError::TenantLimitReached(self.max_tenants));
            }
        }
        let broadcaster = Arc::new(Broadcaster::new(
            tenant.clone(),
            Arc::clone(&self.connector),
            self.settings,
        ));
        map.insert(tenant.clone(), Arc::clone(&broadcaster));
        tracing::info!(%tenant, tenants = map.len(), "tenant created");
        Ok(broadcaster)
    }

    /// Returns the broadcaster for `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TenantNotFound`] if no such tenant exists.
    pub async fn get(&self, tenant: &TenantId) -> Result<Arc<Broadcaster>, RelayError> {
        self.channels
            .read()
            .await
            .get(tenant)
            .cloned()
            .ok_or_else(|| RelayError::TenantNotFound(tenant.to_string()))
    }

    /// Removes a tenant, disconnecting its bridge and closing its sessions.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TenantNotFound`] if no such tenant exists.
    pub async fn remove(&self, tenant: &TenantId) -> Result<(), RelayError> {
        let removed = self
            .channels
            .write()
            .await
            .remove(tenant)
            .ok_or_else(|| RelayError::TenantNotFound(tenant.to_string()))?;
        removed.shutdown().await;
        tracing::info!(%tenant, "tenant removed");
        Ok(())
    }

    /// Drops `tenant` if it has no sessions and no active connection.
    /// Returns `true` if it was removed.
    pub async fn release_if_idle(&self, tenant: &TenantId) -> bool {
        let mut map = self.channels.write().await;
        let Some(broadcaster) = map.get(tenant) else {
            return false;
        };
        if !broadcaster.is_idle().await {
            return false;
        }
        map.remove(tenant);
        tracing::debug!(%tenant, "idle tenant released");
        true
    }

    /// Drops every tenant that has no sessions and no active connection.
    /// Returns how many were removed.
    pub async fn sweep_idle(&self) -> usize {
        let mut map = self.channels.write().await;
        let evicted = evict_idle(&mut map).await;
        if evicted > 0 {
            tracing::debug!(evicted, tenants = map.len(), "idle tenants swept");
        }
        evicted
    }

    /// Returns summaries of all tenants, sorted by tenant id.
    pub async fn list(&self) -> Vec<ChannelSummary> {
        let mut entries: Vec<(TenantId, Arc<Broadcaster>)> = self
            .channels
            .read()
            .await
            .iter()
            .map(|(id, b)| (id.clone(), Arc::clone(b)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut summaries = Vec::with_capacity(entries.len());
        for (_, broadcaster) in entries {
            summaries.push(ChannelSummary::of(&broadcaster).await);
        }
        summaries
    }

    /// Shuts down every tenant. Used on process exit.
    pub async fn shutdown_all(&self) {
        let drained: Vec<Arc<Broadcaster>> = self.channels.write().await.drain().map(|(_, b)| b).collect();
        for broadcaster in drained {
            broadcaster.shutdown().await;
        }
    }

    /// Returns the number of tenants.
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Returns `true` if the registry holds no tenants.
    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

async fn evict_idle(map: &mut HashMap<TenantId, Arc<Broadcaster>>) -> usize {
    let mut idle = Vec::new();
    for (tenant, broadcaster) in map.iter() {
        if broadcaster.is_idle().await {
            idle.push(tenant.clone());
        }
    }
    for tenant in &idle {
        map.remove(tenant);
    }
    idle.len()
}
