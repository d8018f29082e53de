//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::fmt;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::TenantId;
use crate::service::BroadcasterSettings;
use crate::transport::TwitchIrcConfig;
use crate::transport::twitch::DEFAULT_TWITCH_IRC_URL;

/// Error returned by [`RelayConfig::from_env`].
pub type ConfigError = Box<dyn std::error::Error + Send + Sync>;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Twitch IRC-over-WebSocket endpoint.
    pub twitch_irc_url: String,

    /// Upper bound in seconds for opening the chat socket and logging in.
    pub connect_timeout_secs: u64,

    /// Outbound chat lines allowed per rate-limit window.
    pub rate_limit_messages: usize,

    /// Length of the outbound rate-limit window in seconds.
    pub rate_limit_period_secs: u64,

    /// Events buffered per viewer session before copies are dropped.
    pub session_queue_capacity: usize,

    /// Events buffered between a chat transport and its bridge.
    pub transport_event_capacity: usize,

    /// Tenant served by `/ws`.
    pub default_tenant: TenantId,

    /// Maximum number of tenants (0 = unlimited).
    pub max_tenants: usize,

    /// Timeout in seconds for REST requests.
    pub request_timeout_secs: u64,

    /// Interval in seconds between idle-tenant sweeps (0 = disabled).
    pub idle_sweep_secs: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults for unset variables.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but malformed or outside its
    /// allowed range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| format!("LISTEN_ADDR: {e}"))?;

        let twitch_irc_url =
            std::env::var("TWITCH_IRC_URL").unwrap_or_else(|_| DEFAULT_TWITCH_IRC_URL.to_string());

        let default_tenant =
            TenantId::parse(&std::env::var("DEFAULT_TENANT").unwrap_or_else(|_| "default".to_string()))?;

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            twitch_irc_url,
            connect_timeout_secs: env_in("TWITCH_CONNECT_TIMEOUT_SECS", 10, 1..=300)?,
            rate_limit_messages: env_in("RATE_LIMIT_MESSAGES", 750, 1..=100_000)?,
            rate_limit_period_secs: env_in("RATE_LIMIT_PERIOD_SECS", 30, 1..=3_600)?,
            session_queue_capacity: env_in("SESSION_QUEUE_CAPACITY", 256, 1..=65_536)?,
            transport_event_capacity: env_in("TRANSPORT_EVENT_CAPACITY", 1024, 1..=65_536)?,
            default_tenant,
            max_tenants: env_in("MAX_TENANTS", 0, 0..=usize::MAX)?,
            request_timeout_secs: env_in("REQUEST_TIMEOUT_SECS", 30, 1..=3_600)?,
            idle_sweep_secs: env_in("IDLE_SWEEP_SECS", 60, 0..=86_400)?,
            log_format,
        })
    }

    /// Settings for the Twitch chat connector.
    #[must_use]
    pub fn twitch_irc(&self) -> TwitchIrcConfig {
        TwitchIrcConfig {
            url: self.twitch_irc_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_messages: self.rate_limit_messages,
            rate_limit_period: Duration::from_secs(self.rate_limit_period_secs),
        }
    }

    /// Queue sizes for every broadcaster.
    #[must_use]
    pub fn broadcaster_settings(&self) -> BroadcasterSettings {
        BroadcasterSettings {
            session_queue_capacity: self.session_queue_capacity,
            transport_event_capacity: self.transport_event_capacity,
        }
    }

    /// Interval between idle-tenant sweeps, or `None` when disabled.
    #[must_use]
    pub fn idle_sweep(&self) -> Option<Duration> {
        (self.idle_sweep_secs > 0).then(|| Duration::from_secs(self.idle_sweep_secs))
    }

    /// Timeout applied to REST requests.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            twitch_irc_url: DEFAULT_TWITCH_IRC_URL.to_string(),
            connect_timeout_secs: 10,
            rate_limit_messages: 750,
            rate_limit_period_secs: 30,
            session_queue_capacity: 256,
            transport_event_capacity: 1024,
            default_tenant: TenantId::default_tenant(),
            max_tenants: 0,
            request_timeout_secs: 30,
            idle_sweep_secs: 60,
            log_format: LogFormat::Text,
        }
    }
}

/// Reads `key` from the environment; see [`parse_in`].
fn env_in<T>(key: &str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
    T::Err: fmt::Display,
{
    parse_in(key, std::env::var(key).ok().as_deref(), default, range)
}

/// Parses `raw` as `T`. A missing value yields `default`; a malformed or
/// out-of-range one is an error naming `key`.
fn parse_in<T>(key: &str, raw: Option<&str>, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
    T::Err: fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .map_err(|e| format!("{key}: cannot parse {raw:?}: {e}"))?;
    if !range.contains(&value) {
        return Err(format!(
            "{key}: {value} is outside {}..={}",
            range.start(),
            range.end()
        )
        .into());
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_twitch_limits() {
        let config = RelayConfig::default();
        let irc = config.twitch_irc();
        assert_eq!(irc.rate_limit_messages, 750);
        assert_eq!(irc.rate_limit_period, Duration::from_secs(30));
        assert_eq!(irc.url, DEFAULT_TWITCH_IRC_URL);
        assert_eq!(config.default_tenant.as_str(), "default");
    }

    #[test]
    fn missing_value_uses_default() {
        assert!(matches!(parse_in("KEY", None, 42usize, 1..=100), Ok(42)));
    }

    #[test]
    fn valid_value_is_parsed() {
        assert!(matches!(parse_in("KEY", Some(" 15 "), 10u64, 1..=300), Ok(15)));
    }

    #[test]
    fn malformed_value_is_rejected() {
        let Err(err) = parse_in("TWITCH_CONNECT_TIMEOUT_SECS", Some("ten"), 10u64, 1..=300) else {
            panic!("malformed value accepted");
        };
        assert!(err.to_string().contains("TWITCH_CONNECT_TIMEOUT_SECS"));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let huge = u64::MAX.to_string();
        assert!(parse_in("TWITCH_CONNECT_TIMEOUT_SECS", Some(huge.as_str()), 10u64, 1..=300).is_err());
        assert!(parse_in("RATE_LIMIT_PERIOD_SECS", Some("0"), 30u64, 1..=3_600).is_err());
    }

    #[test]
    fn zero_sweep_interval_disables_sweeps() {
        let config = RelayConfig {
            idle_sweep_secs: 0,
            ..RelayConfig::default()
        };
        assert_eq!(config.idle_sweep(), None);
        assert_eq!(RelayConfig::default().idle_sweep(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn broadcaster_settings_follow_config() {
        let config = RelayConfig {
            session_queue_capacity: 7,
            transport_event_capacity: 9,
            ..RelayConfig::default()
        };
        let settings = config.broadcaster_settings();
        assert_eq!(settings.session_queue_capacity, 7);
        assert_eq!(settings.transport_event_capacity, 9);
    }
}
