//! Bot credentials supplied with every connect command.

use std::fmt;

use crate::error::ConnectError;

/// Prefix Twitch IRC expects in front of the access token in `PASS`.
const OAUTH_PREFIX: &str = "oauth:";

/// Credentials for one Twitch chat connection.
///
/// Transient: supplied per connect call and never persisted. The `Debug`
/// implementation redacts the access token so credentials can safely
/// appear in tracing output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name of the bot account.
    pub bot_name: String,
    /// OAuth access token of the bot account.
    pub access_token: String,
    /// Twitch channel the bot should join.
    pub channel_name: String,
}

impl Credentials {
    /// Creates credentials from raw strings without validating them.
    #[must_use]
    pub fn new(
        bot_name: impl Into<String>,
        access_token: impl Into<String>,
        channel_name: impl Into<String>,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            access_token: access_token.into(),
            channel_name: channel_name.into(),
        }
    }

    /// Checks that every field is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidCredentials`] naming the first field
    /// that is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ConnectError> {
        let fields = [
            ("bot_name", &self.bot_name),
            ("access_token", &self.access_token),
            ("channel_name", &self.channel_name),
        ];
        for (field, value) in fields {
            let value = value.trim();
            let bare = value.strip_prefix(OAUTH_PREFIX).unwrap_or(value);
            let bare = if field == "channel_name" {
                bare.trim_start_matches('#')
            } else {
                bare
            };
            if bare.is_empty() {
                return Err(ConnectError::InvalidCredentials { field });
            }
        }
        Ok(())
    }

    /// Validates and returns a copy normalized for the IRC handshake.
    ///
    /// The channel is lower-cased with any leading `#` removed, the bot
    /// name is lower-cased, and the token is given an `oauth:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidCredentials`] when [`Self::validate`]
    /// fails.
    pub fn normalized(&self) -> Result<Self, ConnectError> {
        self.validate()?;
        let token = self.access_token.trim();
        let access_token = if token.starts_with(OAUTH_PREFIX) {
            token.to_string()
        } else {
            format!("{OAUTH_PREFIX}{token}")
        };
        Ok(Self {
            bot_name: self.bot_name.trim().to_ascii_lowercase(),
            access_token,
            channel_name: self
                .channel_name
                .trim()
                .trim_start_matches('#')
                .to_ascii_lowercase(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_name", &self.bot_name)
            .field("access_token", &"<redacted>")
            .field("channel_name", &self.channel_name)
            .finish()
    }
}
