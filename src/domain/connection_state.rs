//! Lifecycle state of a chat bridge's external connection.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Connection state owned by [`crate::service::ChatBridge`].
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──transport up──▶ Connected
///      ▲                        │                            │
///      └──── failure / disconnect ◀──────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Disconnected,
    /// A transport was opened and is performing its handshake.
    Connecting,
    /// The transport reported a live, authenticated connection.
    Connected,
}

impl ConnectionState {
    /// Returns the state as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Returns `true` unless the state is [`ConnectionState::Disconnected`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
