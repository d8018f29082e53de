//! Per-viewer WebSocket connection loop.
//!
//! Forwards every event dispatched to the viewer's session to the socket
//! and feeds viewer commands back into the tenant's broadcaster.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientCommand, ServerMessage};
use crate::domain::{Session, SessionId};
use crate::service::{Broadcaster, ChannelRegistry};

/// Runs the read/write loop for a single viewer connection.
///
/// - Reads commands from the viewer and dispatches them.
/// - Forwards events from the viewer's session queue.
///
/// `session` must already be registered on `broadcaster` (see
/// [`ChannelRegistry::join`]). On exit the session is unregistered and the
/// tenant released if idle.
pub async fn run_connection(
    socket: WebSocket,
    broadcaster: Arc<Broadcaster>,
    mut session: Session,
    registry: Arc<ChannelRegistry>,
) {
    let session_id = session.id();
    let (mut ws_tx, mut ws_rx) = socket.split();
    tracing::debug!(tenant = %broadcaster.tenant(), %session_id, "viewer connected");

    loop {
        tokio::select! {
            // Incoming message from viewer
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(text.as_str(), &broadcaster, session_id).await;
                        if let Some(json) = reply.and_then(|m| m.to_json())
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%session_id, error = %err, "viewer socket error");
                        break;
                    }
                    _ => {}
                }
            }
            // Event from the broadcaster
            event = session.recv() => {
                let Some(event) = event else {
                    // Unregistered elsewhere, e.g. tenant removed.
                    break;
                };
                if let Some(json) = ServerMessage::from(&event).to_json()
                    && ws_tx.send(Message::text(json)).await.is_err() {
                        break;
                    }
            }
        }
    }

    broadcaster.unregister_session(session_id);
    let _ = registry.release_if_idle(broadcaster.tenant()).await;
    tracing::debug!(%session_id, "viewer connection closed");
}

/// Handles a text message from the viewer, returning an optional direct
/// reply.
async fn handle_text_message(
    text: &str,
    broadcaster: &Broadcaster,
    session_id: SessionId,
) -> Option<ServerMessage> {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            let (code, message) = if serde_json::from_str::<serde_json::Value>(text).is_ok() {
                (404, format!("unknown command: {err}"))
            } else {
                (400, "malformed JSON".to_string())
            };
            return Some(ServerMessage::error(code, message));
        }
    };

    match command {
        ClientCommand::ConnectToTwitch { .. } => {
            let credentials = command.credentials()?;
            // Failures were already pushed to this session's queue.
            let _ = broadcaster
                .handle_connect_command(session_id, credentials)
                .await;
            None
        }
        ClientCommand::Disconnect => {
            let _ = broadcaster.handle_disconnect_command(session_id).await;
            None
        }
        ClientCommand::Status => {
            let status = broadcaster.status().await;
            Some(ServerMessage::Status {
                tenant: broadcaster.tenant().to_string(),
                state: status.state,
                channel: status.channel,
                sessions: broadcaster.session_count(),
            })
        }
    }
}
