//! Normalized chat events flowing from the bridge to viewer sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status text emitted when a connection attempt starts.
pub const STATUS_CONNECTING: &str = "Connecting to Twitch...";
/// Status text emitted when the transport reports a live connection.
pub const STATUS_CONNECTED: &str = "Connected to Twitch!";
/// Status text emitted when the connection is lost or closed.
pub const STATUS_DISCONNECTED: &str = "Disconnected from Twitch.";
/// Text delivered to the requesting session when credentials are missing.
pub const STATUS_NO_CREDENTIALS: &str = "Unable to connect to Twitch. No credentials found.";

/// One immutable chat or status event.
///
/// Chat events carry the sender's display name; status events produced by
/// the bridge itself do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    display_name: Option<String>,
    message: String,
    timestamp: DateTime<Utc>,
}

impl ChatEvent {
    /// Creates a chat event for a message sent by `display_name`.
    #[must_use]
    pub fn chat(display_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a status event with no sender.
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            display_name: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Sender display name, `None` for status events.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Raw message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Time the event was constructed.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns `true` if this event was produced by the bridge.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        self.display_name.is_none()
    }

    /// Text pushed to viewers: `"name: message"` for chat, the bare
    /// message for status events.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{name}: {}", self.message),
            None => self.message.clone(),
        }
    }
}
