//! WebSocket message types exchanged with viewer clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChatEvent, ConnectionState, Credentials};

/// Commands that a viewer can send over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Connect the tenant's bridge to Twitch. Fire-and-forget: the outcome
    /// arrives as `chat_message` events.
    ConnectToTwitch {
        /// Bot login name.
        #[serde(default, alias = "botName")]
        bot_name: String,
        /// Bot OAuth access token.
        #[serde(default, alias = "botAccessToken")]
        bot_access_token: String,
        /// Channel to join.
        #[serde(default, alias = "channelName")]
        channel_name: String,
    },
    /// Disconnect the tenant's bridge.
    Disconnect,
    /// Ask for the tenant's current state.
    Status,
}

impl ClientCommand {
    /// Credentials carried by a `connect_to_twitch` command.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match self {
            Self::ConnectToTwitch {
                bot_name,
                bot_access_token,
                channel_name,
            } => Some(Credentials::new(
                bot_name.as_str(),
                bot_access_token.as_str(),
                channel_name.as_str(),
            )),
            Self::Disconnect | Self::Status => None,
        }
    }
}

/// Messages the server pushes to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A chat line or bridge status text.
    ChatMessage {
        /// Rendered text, e.g. `"X: hi"`.
        text: String,
        /// Time the event was produced.
        timestamp: DateTime<Utc>,
    },
    /// Reply to a `status` command.
    Status {
        /// Tenant identifier.
        tenant: String,
        /// Bridge connection state.
        state: ConnectionState,
        /// Channel of the current or most recent connection.
        channel: Option<String>,
        /// Number of connected sessions.
        sessions: usize,
    },
    /// Problem with this viewer's own request.
    Error {
        /// Numeric error code.
        code: u32,
        /// Human-readable message.
        message: String,
    },
}

impl From<&ChatEvent> for ServerMessage {
    fn from(event: &ChatEvent) -> Self {
        Self::ChatMessage {
            text: event.text(),
            timestamp: event.timestamp(),
        }
    }
}

impl ServerMessage {
    /// Builds an error message.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Serializes to a JSON string, logging instead of failing.
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize server message");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_command() {
        let json = r#"{"command":"connect_to_twitch","bot_name":"b","bot_access_token":"t","channel_name":"c"}"#;
        let Ok(cmd) = serde_json::from_str::<ClientCommand>(json) else {
            panic!("should parse");
        };
        let Some(creds) = cmd.credentials() else {
            panic!("connect carries credentials");
        };
        assert_eq!(creds, Credentials::new("b", "t", "c"));
    }

    #[test]
    fn accepts_camel_case_fields() {
        let json = r#"{"command":"connect_to_twitch","botName":"b","botAccessToken":"t","channelName":"c"}"#;
        let cmd = serde_json::from_str::<ClientCommand>(json).ok();
        assert_eq!(
            cmd.and_then(|c| c.credentials()),
            Some(Credentials::new("b", "t", "c"))
        );
    }

    #[test]
    fn missing_fields_become_empty() {
        let json = r#"{"command":"connect_to_twitch","bot_name":"b"}"#;
        let cmd = serde_json::from_str::<ClientCommand>(json).ok();
        let creds = cmd.and_then(|c| c.credentials());
        assert_eq!(creds.map(|c| c.access_token), Some(String::new()));
    }

    #[test]
    fn unit_commands_parse() {
        assert!(matches!(
            serde_json::from_str::<ClientCommand>(r#"{"command":"disconnect"}"#),
            Ok(ClientCommand::Disconnect)
        ));
        assert!(matches!(
            serde_json::from_str::<ClientCommand>(r#"{"command":"status"}"#),
            Ok(ClientCommand::Status)
        ));
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"dance"}"#).is_err());
    }

    #[test]
    fn chat_message_serializes_with_type_tag() {
        let msg = ServerMessage::from(&ChatEvent::chat("X", "hi"));
        let json = msg.to_json().unwrap_or_default();
        assert!(json.contains(r#""type":"chat_message""#));
        assert!(json.contains(r#""text":"X: hi""#));
    }

    #[test]
    fn error_serializes() {
        let json = ServerMessage::error(400, "malformed JSON")
            .to_json()
            .unwrap_or_default();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":400"#));
    }
}
