//! Twitch chat over IRC-over-WebSocket.
//!
//! [`TwitchIrcConnector`] opens `wss://irc-ws.chat.twitch.tv`, performs the
//! login handshake, keeps the connection alive, and turns `PRIVMSG` lines
//! into [`TransportEvent::Message`]s. Every outbound line passes through a
//! [`Throttle`].

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use super::irc::IrcMessage;
use super::throttle::Throttle;
use super::{Connector, TransportEvent, TransportHandle};
use crate::domain::Credentials;
use crate::error::TransportError;

/// Default Twitch IRC-over-WebSocket endpoint.
pub const DEFAULT_TWITCH_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Upper bound applied to [`TwitchIrcConfig::connect_timeout`].
pub const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Capabilities requested so `PRIVMSG` carries `display-name` tags.
const CAPABILITIES: &str = "CAP REQ :twitch.tv/tags twitch.tv/commands";

/// `NOTICE` texts Twitch sends before closing on bad credentials.
const AUTH_FAILURE_NOTICES: [&str; 2] = ["Login authentication failed", "Improperly formatted auth"];

/// Connection settings for [`TwitchIrcConnector`].
#[derive(Debug, Clone)]
pub struct TwitchIrcConfig {
    /// WebSocket URL of the IRC endpoint.
    pub url: String,
    /// Upper bound for socket open plus login handshake, capped at
    /// [`MAX_CONNECT_TIMEOUT`].
    pub connect_timeout: Duration,
    /// Outbound lines allowed per `rate_limit_period`.
    pub rate_limit_messages: usize,
    /// Length of the outbound rate-limit window.
    pub rate_limit_period: Duration,
}

impl Default for TwitchIrcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TWITCH_IRC_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            rate_limit_messages: 750,
            rate_limit_period: Duration::from_secs(30),
        }
    }
}

/// [`Connector`] for Twitch chat.
#[derive(Debug, Clone, Default)]
pub struct TwitchIrcConnector {
    config: TwitchIrcConfig,
}

impl TwitchIrcConnector {
    /// Creates a connector with the given settings.
    #[must_use]
    pub fn new(config: TwitchIrcConfig) -> Self {
        Self { config }
    }
}

impl Connector for TwitchIrcConnector {
    fn open(
        &self,
        credentials: Credentials,
        events: mpsc::Sender<TransportEvent>,
    ) -> TransportHandle {
        let config = self.config.clone();
        TransportHandle::spawn(async move {
            let channel = credentials.channel_name.clone();
            match run_irc(&config, &credentials, &events).await {
                Ok(()) => tracing::debug!(%channel, "chat transport stopped by owner"),
                Err(err) => {
                    tracing::warn!(%channel, error = %err, "chat transport disconnected");
                    let _ = events
                        .send(TransportEvent::Disconnected {
                            reason: err.to_string(),
                        })
                        .await;
                }
            }
        })
    }
}

/// What a single inbound line asks the transport to do.
#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Welcome,
    Pong(String),
    Chat { display_name: String, text: String },
    Fatal(String),
    Reconnect,
    Ignore,
}

fn classify(msg: &IrcMessage) -> LineAction {
    match msg.command.as_str() {
        "001" => LineAction::Welcome,
        "PING" => LineAction::Pong(msg.trailing().unwrap_or("tmi.twitch.tv").to_string()),
        "PRIVMSG" => {
            let display_name = msg
                .tag("display-name")
                .filter(|name| !name.is_empty())
                .or_else(|| msg.nick())
                .unwrap_or("unknown")
                .to_string();
            let body = msg.trailing().unwrap_or_default();
            LineAction::Chat {
                display_name,
                text: strip_action(body).to_string(),
            }
        }
        "NOTICE" => {
            let text = msg.trailing().unwrap_or_default();
            if AUTH_FAILURE_NOTICES.iter().any(|n| text.contains(n)) {
                LineAction::Fatal(text.to_string())
            } else {
                LineAction::Ignore
            }
        }
        "RECONNECT" => LineAction::Reconnect,
        _ => LineAction::Ignore,
    }
}

/// Unwraps a CTCP `ACTION` (`/me`) body.
fn strip_action(body: &str) -> &str {
    body.strip_prefix("\u{1}ACTION ")
        .map(|inner| inner.strip_suffix('\u{1}').unwrap_or(inner))
        .unwrap_or(body)
}

fn handshake_lines(credentials: &Credentials) -> [String; 4] {
    [
        CAPABILITIES.to_string(),
        format!("PASS {}", credentials.access_token),
        format!("NICK {}", credentials.bot_name),
        format!("JOIN #{}", credentials.channel_name),
    ]
}

async fn send_line<S>(sink: &mut S, throttle: &mut Throttle, line: &str) -> Result<(), TransportError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    throttle.acquire().await;
    sink.send(Message::text(format!("{line}\r\n"))).await?;
    Ok(())
}

/// Drives one connection until it fails. `Ok(())` means the event
/// receiver went away, i.e. the bridge no longer wants this transport.
async fn run_irc(
    config: &TwitchIrcConfig,
    credentials: &Credentials,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<(), TransportError> {
    let connect_timeout = config.connect_timeout.min(MAX_CONNECT_TIMEOUT);
    let deadline = Instant::now() + connect_timeout;

    let (socket, _response) = tokio::time::timeout_at(deadline, connect_async(config.url.as_str()))
        .await
        .map_err(|_| TransportError::Timeout(connect_timeout))??;
    let (mut sink, mut stream) = socket.split();
    let mut throttle = Throttle::new(config.rate_limit_messages, config.rate_limit_period);

    tracing::debug!(url = %config.url, channel = %credentials.channel_name, "chat socket open, logging in");
    for line in handshake_lines(credentials) {
        send_line(&mut sink, &mut throttle, &line).await?;
    }

    let mut connected = false;
    loop {
        let frame = if connected {
            stream.next().await
        } else {
            tokio::time::timeout_at(deadline, stream.next())
                .await
                .map_err(|_| TransportError::Timeout(connect_timeout))?
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "closed by server".to_string());
                return Err(TransportError::Closed(reason));
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => return Err(err.into()),
            None => return Err(TransportError::Closed("stream ended".to_string())),
        };

        for line in text.as_str().lines().filter(|l| !l.is_empty()) {
            let Some(msg) = IrcMessage::parse(line) else {
                tracing::debug!(line, "unparseable chat line");
                continue;
            };
            match classify(&msg) {
                LineAction::Welcome => {
                    if !connected {
                        connected = true;
                        tracing::info!(channel = %credentials.channel_name, "logged in to chat");
                        if events.send(TransportEvent::Connected).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                LineAction::Pong(token) => {
                    send_line(&mut sink, &mut throttle, &format!("PONG :{token}")).await?;
                }
                LineAction::Chat { display_name, text } => {
                    let event = TransportEvent::Message { display_name, text };
                    if events.send(event).await.is_err() {
                        return Ok(());
                    }
                }
                LineAction::Fatal(notice) => {
                    return Err(TransportError::AuthenticationFailed(notice));
                }
                LineAction::Reconnect => return Err(TransportError::ReconnectRequested),
                LineAction::Ignore => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn classify_line(line: &str) -> LineAction {
        let Some(msg) = IrcMessage::parse(line) else {
            panic!("unparseable test line");
        };
        classify(&msg)
    }

    #[test]
    fn privmsg_uses_display_name_tag() {
        let action = classify_line("@display-name=Xavier :xavier!xavier@xavier.tmi.twitch.tv PRIVMSG #c :hi");
        assert_eq!(
            action,
            LineAction::Chat {
                display_name: "Xavier".into(),
                text: "hi".into()
            }
        );
    }

    #[test]
    fn privmsg_falls_back_to_nick() {
        let action = classify_line("@display-name= :xavier!xavier@xavier.tmi.twitch.tv PRIVMSG #c :yo");
        assert_eq!(
            action,
            LineAction::Chat {
                display_name: "xavier".into(),
                text: "yo".into()
            }
        );
    }

    #[test]
    fn action_messages_are_unwrapped() {
        let action = classify_line(":a!a@a PRIVMSG #c :\u{1}ACTION waves\u{1}");
        assert_eq!(
            action,
            LineAction::Chat {
                display_name: "a".into(),
                text: "waves".into()
            }
        );
    }

    #[test]
    fn ping_echoes_token() {
        assert_eq!(
            classify_line("PING :tmi.twitch.tv"),
            LineAction::Pong("tmi.twitch.tv".into())
        );
    }

    #[test]
    fn auth_failure_notice_is_fatal() {
        let action = classify_line(":tmi.twitch.tv NOTICE * :Login authentication failed");
        assert_eq!(action, LineAction::Fatal("Login authentication failed".into()));
    }

    #[test]
    fn other_notices_are_ignored() {
        let action = classify_line("@msg-id=slow_on :tmi.twitch.tv NOTICE #c :This room is in slow mode.");
        assert_eq!(action, LineAction::Ignore);
    }

    #[test]
    fn welcome_and_reconnect() {
        assert_eq!(classify_line(":tmi.twitch.tv 001 bot :Welcome, GLHF!"), LineAction::Welcome);
        assert_eq!(classify_line(":tmi.twitch.tv RECONNECT"), LineAction::Reconnect);
        assert_eq!(classify_line(":tmi.twitch.tv 372 bot :You are in a maze"), LineAction::Ignore);
    }

    #[test]
    fn handshake_order() {
        let creds = Credentials::new("bot", "oauth:tok", "chan");
        let lines = handshake_lines(&creds);
        assert_eq!(
            lines,
            [
                "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
                "PASS oauth:tok".to_string(),
                "NICK bot".to_string(),
                "JOIN #chan".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_disconnect() {
        let connector = TwitchIrcConnector::new(TwitchIrcConfig {
            url: "ws://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..TwitchIrcConfig::default()
        });
        let (tx, mut rx) = mpsc::channel(8);
        let _handle = connector.open(Credentials::new("bot", "oauth:tok", "chan"), tx);
        match rx.recv().await {
            Some(TransportEvent::Disconnected { .. }) => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_connect_timeout_is_capped() {
        let connector = TwitchIrcConnector::new(TwitchIrcConfig {
            url: "ws://127.0.0.1:1".to_string(),
            connect_timeout: Duration::MAX,
            ..TwitchIrcConfig::default()
        });
        let (tx, mut rx) = mpsc::channel(8);
        let _handle = connector.open(Credentials::new("bot", "oauth:tok", "chan"), tx);
        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::Disconnected { .. })
        ));
    }
}
