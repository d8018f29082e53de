//! twitch-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and viewer WebSocket endpoints.

use tracing_subscriber::EnvFilter;

use twitch_relay::config::{LogFormat, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        irc = %config.twitch_irc_url,
        default_tenant = %config.default_tenant,
        "starting twitch-relay"
    );

    twitch_relay::server::serve(config).await
}
