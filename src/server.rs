//! Router assembly and server startup.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::service::ChannelRegistry;
use crate::transport::{Connector, TwitchIrcConnector};
use crate::ws::handler::{tenant_ws_handler, ws_handler};

/// Builds application state around `connector`.
#[must_use]
pub fn build_state(config: &RelayConfig, connector: Arc<dyn Connector>) -> AppState {
    let registry = Arc::new(ChannelRegistry::new(
        connector,
        config.broadcaster_settings(),
        config.max_tenants,
    ));
    AppState {
        registry,
        default_tenant: config.default_tenant.clone(),
    }
}

/// Builds the full router: REST, docs, and viewer WebSocket endpoints.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let rest = api::build_router().layer(TimeoutLayer::new(request_timeout));
    Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler))
        .route("/ws/{tenant}", get(tenant_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `config.listen_addr` and serves until Ctrl-C, then shuts every
/// tenant down.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let connector: Arc<dyn Connector> = Arc::new(TwitchIrcConnector::new(config.twitch_irc()));
    let state = build_state(&config, connector);
    let registry = Arc::clone(&state.registry);
    let app = build_app(state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let sweeper = config
        .idle_sweep()
        .map(|period| spawn_idle_sweeper(Arc::clone(&registry), period));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    registry.shutdown_all().await;
    tracing::info!("server stopped");
    Ok(())
}

/// Periodically drops tenants left without viewers or a connection, e.g.
/// after their chat transport failed with nobody watching.
pub fn spawn_idle_sweeper(registry: Arc<ChannelRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep_idle().await;
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::TenantId;
    use crate::service::chat_bridge::tests::ScriptedConnector;

    #[tokio::test(start_paused = true)]
    async fn sweeper_reclaims_idle_tenants() {
        let state = build_state(&RelayConfig::default(), Arc::new(ScriptedConnector::default()));
        let Ok(tenant) = TenantId::parse("quiet") else {
            panic!("valid tenant");
        };
        let _ = state.registry.get_or_create(&tenant).await;

        let sweeper = spawn_idle_sweeper(Arc::clone(&state.registry), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(state.registry.len().await, 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(state.registry.is_empty().await);
        sweeper.abort();
    }
}
