//! Broadcaster: one tenant's viewer sessions plus its chat bridge.

use std::sync::Arc;

use super::chat_bridge::{BridgeStatus, ChatBridge, EventSink};
use crate::domain::chat_event::STATUS_NO_CREDENTIALS;
use crate::domain::{ChatEvent, ConnectionState, Credentials, DispatchReport, Session, SessionId, SessionSet, TenantId};
use crate::error::ConnectError;
use crate::transport::Connector;

/// Queue sizes used when building a [`Broadcaster`].
#[derive(Debug, Clone, Copy)]
pub struct BroadcasterSettings {
    /// Events buffered per viewer session before copies are dropped.
    pub session_queue_capacity: usize,
    /// Events buffered between the transport and the bridge.
    pub transport_event_capacity: usize,
}

impl Default for BroadcasterSettings {
    fn default() -> Self {
        Self {
            session_queue_capacity: 256,
            transport_event_capacity: 1024,
        }
    }
}

impl EventSink for SessionSet {
    fn publish(&self, event: ChatEvent) {
        let report = self.dispatch(&event);
        tracing::trace!(
            delivered = report.delivered,
            lagged = report.lagged,
            removed = report.removed,
            "chat event dispatched"
        );
    }
}

/// Fans chat events out to every session of one tenant and accepts
/// connect/disconnect commands from any of them.
#[derive(Debug)]
pub struct Broadcaster {
    tenant: TenantId,
    sessions: Arc<SessionSet>,
    bridge: ChatBridge,
}

impl Broadcaster {
    /// Creates a broadcaster whose bridge opens connections via
    /// `connector`.
    #[must_use]
    pub fn new(tenant: TenantId, connector: Arc<dyn Connector>, settings: BroadcasterSettings) -> Self {
        let sessions = Arc::new(SessionSet::new(settings.session_queue_capacity));
        let sink: Arc<dyn EventSink> = Arc::clone(&sessions) as Arc<dyn EventSink>;
        let bridge = ChatBridge::new(connector, sink, settings.transport_event_capacity);
        Self {
            tenant,
            sessions,
            bridge,
        }
    }

    /// Tenant this broadcaster serves.
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// The bridge owned by this broadcaster.
    #[must_use]
    pub fn bridge(&self) -> &ChatBridge {
        &self.bridge
    }

    /// Adds a session and returns its receiving end.
    pub fn register_session(&self, id: SessionId) -> Session {
        let session = self.sessions.register(id);
        tracing::debug!(tenant = %self.tenant, session_id = %id, "session registered");
        session
    }

    /// Removes a session. Safe if it is already gone.
    pub fn unregister_session(&self, id: SessionId) -> bool {
        let removed = self.sessions.unregister(id);
        if removed {
            tracing::debug!(tenant = %self.tenant, session_id = %id, "session unregistered");
        }
        removed
    }

    /// Delivers `event` to every current session.
    pub fn dispatch(&self, event: &ChatEvent) -> DispatchReport {
        self.sessions.dispatch(event)
    }

    /// Forwards a connect command from `session_id` to the bridge.
    ///
    /// A failure is reported only to the requesting session, never
    /// broadcast.
    ///
    /// # Errors
    ///
    /// Returns the bridge's [`ConnectError`] after it has been pushed to
    /// the requesting session.
    pub async fn handle_connect_command(
        &self,
        session_id: SessionId,
        credentials: Credentials,
    ) -> Result<(), ConnectError> {
        tracing::info!(
            tenant = %self.tenant,
            %session_id,
            channel = %credentials.channel_name,
            "connect requested"
        );
        let result = self.bridge.connect(&credentials).await;
        if let Err(err) = &result {
            tracing::info!(tenant = %self.tenant, %session_id, error = %err, "connect rejected");
            if let Err(delivery) = self
                .sessions
                .deliver_to(session_id, ChatEvent::status(STATUS_NO_CREDENTIALS))
            {
                tracing::debug!(%session_id, error = %delivery, "could not report connect failure");
            }
        }
        result
    }

    /// Forwards a disconnect command from `session_id` to the bridge.
    /// Returns `true` if a connection was torn down.
    pub async fn handle_disconnect_command(&self, session_id: SessionId) -> bool {
        tracing::info!(tenant = %self.tenant, %session_id, "disconnect requested");
        self.bridge.disconnect().await
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Current bridge connection state.
    pub async fn state(&self) -> ConnectionState {
        self.bridge.state().await
    }

    /// Current bridge state and channel.
    pub async fn status(&self) -> BridgeStatus {
        self.bridge.status().await
    }

    /// Returns `true` when nobody is watching and nothing is connected.
    /// Sessions whose socket task is gone do not count as watching.
    pub async fn is_idle(&self) -> bool {
        let pruned = self.sessions.prune_closed();
        if pruned > 0 {
            tracing::debug!(tenant = %self.tenant, pruned, "dropped abandoned sessions");
        }
        self.sessions.is_empty() && !self.bridge.state().await.is_active()
    }

    /// Disconnects the bridge and drops every session.
    pub async fn shutdown(&self) {
        let _ = self.bridge.disconnect().await;
        self.sessions.clear();
        tracing::info!(tenant = %self.tenant, "broadcaster shut down");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::chat_event::{STATUS_CONNECTED, STATUS_CONNECTING};
    use crate::service::chat_bridge::tests::{ScriptedConnector, settle};
    use crate::transport::TransportEvent;

    fn broadcaster() -> (Broadcaster, Arc<ScriptedConnector>) {
        let connector = Arc::new(ScriptedConnector::default());
        let Ok(tenant) = TenantId::parse("test") else {
            panic!("valid tenant");
        };
        let b = Broadcaster::new(
            tenant,
            Arc::clone(&connector) as Arc<dyn Connector>,
            BroadcasterSettings::default(),
        );
        (b, connector)
    }

    fn drain(session: &mut Session) -> Vec<String> {
        std::iter::from_fn(|| session.try_recv()).map(|e| e.text()).collect()
    }

    #[tokio::test]
    async fn chat_message_reaches_every_session() {
        let (b, connector) = broadcaster();
        let mut s1 = b.register_session(SessionId::new());
        let mut s2 = b.register_session(SessionId::new());

        let result = b
            .handle_connect_command(s1.id(), Credentials::new("bot", "token", "chan"))
            .await;
        assert!(result.is_ok());

        let tx = connector.sender(0);
        let _ = tx.send(TransportEvent::Connected).await;
        let _ = tx
            .send(TransportEvent::Message {
                display_name: "X".into(),
                text: "hi".into(),
            })
            .await;
        settle().await;

        let expected = vec![
            STATUS_CONNECTING.to_string(),
            STATUS_CONNECTED.to_string(),
            "X: hi".to_string(),
        ];
        assert_eq!(drain(&mut s1), expected);
        assert_eq!(drain(&mut s2), expected);
    }

    #[tokio::test]
    async fn invalid_credentials_only_reach_requester() {
        let (b, connector) = broadcaster();
        let mut requester = b.register_session(SessionId::new());
        let mut other = b.register_session(SessionId::new());

        let result = b
            .handle_connect_command(requester.id(), Credentials::new("bot", "", "chan"))
            .await;
        assert_eq!(
            result,
            Err(ConnectError::InvalidCredentials {
                field: "access_token"
            })
        );
        settle().await;

        assert_eq!(drain(&mut requester), vec![STATUS_NO_CREDENTIALS.to_string()]);
        assert!(drain(&mut other).is_empty());
        assert_eq!(connector.open_count(), 0);
        assert_eq!(b.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn dead_session_does_not_starve_live_one() {
        let (b, _connector) = broadcaster();
        let dead = b.register_session(SessionId::new());
        let mut live = b.register_session(SessionId::new());
        drop(dead);

        let report = b.dispatch(&ChatEvent::chat("X", "hi"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(b.session_count(), 1);
        assert_eq!(drain(&mut live), vec!["X: hi".to_string()]);
    }

    #[tokio::test]
    async fn disconnect_command_and_idle() {
        let (b, _connector) = broadcaster();
        let session = b.register_session(SessionId::new());
        let _ = b
            .handle_connect_command(session.id(), Credentials::new("bot", "token", "chan"))
            .await;
        assert!(!b.is_idle().await);

        assert!(b.handle_disconnect_command(session.id()).await);
        assert!(!b.handle_disconnect_command(session.id()).await);
        assert!(b.unregister_session(session.id()));
        assert!(b.is_idle().await);
    }

    #[tokio::test]
    async fn shutdown_clears_sessions() {
        let (b, _connector) = broadcaster();
        let mut session = b.register_session(SessionId::new());
        let _ = b
            .handle_connect_command(session.id(), Credentials::new("bot", "token", "chan"))
            .await;
        b.shutdown().await;
        assert_eq!(b.session_count(), 0);
        assert_eq!(b.state().await, ConnectionState::Disconnected);
        assert!(!session.is_live());
        // Connecting + Disconnected were queued before the session closed.
        assert_eq!(session.recv().await.map(|e| e.text()), Some(STATUS_CONNECTING.to_string()));
    }
}
