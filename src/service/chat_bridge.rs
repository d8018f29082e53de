//! Chat bridge: one managed external connection per tenant.
//!
//! [`ChatBridge`] owns at most one [`TransportHandle`] at a time and turns
//! the transport's [`TransportEvent`]s into [`ChatEvent`]s for an
//! [`EventSink`].
//!
//! # Concurrency
//!
//! All connection state lives behind one `tokio::sync::Mutex` (single
//! writer). Every connection attempt gets a fresh generation number and
//! events from an older generation are discarded, so an explicit
//! [`ChatBridge::disconnect`] always wins over an in-flight connect.
//! Events are published while the lock is held: viewers see status
//! changes in the same order the state machine made them.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::domain::chat_event::{STATUS_CONNECTED, STATUS_CONNECTING, STATUS_DISCONNECTED};
use crate::domain::{ChatEvent, ConnectionState, Credentials};
use crate::error::ConnectError;
use crate::transport::{Connector, TransportEvent, TransportHandle};

/// Receives events produced by a [`ChatBridge`].
///
/// Implementations must not block: `publish` is called with the bridge
/// lock held.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Delivers one event.
    fn publish(&self, event: ChatEvent);
}

/// Point-in-time view of a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    /// Current connection state.
    pub state: ConnectionState,
    /// Channel of the current or most recent connection attempt.
    pub channel: Option<String>,
}

/// Bridge between one external chat connection and an [`EventSink`].
#[derive(Debug)]
pub struct ChatBridge {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn EventSink>,
    event_capacity: usize,
    link: Mutex<Link>,
}

#[derive(Debug, Default)]
struct Link {
    state: ConnectionState,
    generation: u64,
    channel: Option<String>,
    active: Option<ActiveTransport>,
}

/// The live transport plus the task pumping its events.
#[derive(Debug)]
struct ActiveTransport {
    _transport: TransportHandle,
    pump: JoinHandle<()>,
}

impl Drop for ActiveTransport {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl ChatBridge {
    /// Creates a disconnected bridge.
    ///
    /// `event_capacity` bounds the queue between the transport and the
    /// pump task.
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        sink: Arc<dyn EventSink>,
        event_capacity: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                sink,
                event_capacity: event_capacity.max(1),
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Starts a connection with `credentials`, replacing any existing one.
    ///
    /// Emits "Connecting to Twitch..." before returning; the outcome is
    /// reported later as "Connected to Twitch!" or "Disconnected from
    /// Twitch.". Never waits for the network.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidCredentials`] if any credential field
    /// is empty. Nothing is emitted and no connection is touched in that
    /// case.
    pub async fn connect(&self, credentials: &Credentials) -> Result<(), ConnectError> {
        let credentials = credentials.normalized()?;
        let shared = &self.shared;

        let mut link = shared.link.lock().await;
        if let Some(previous) = link.active.take() {
            tracing::info!(
                previous_channel = ?link.channel,
                "tearing down existing chat transport"
            );
            drop(previous);
        }
        link.generation = link.generation.wrapping_add(1);
        link.state = ConnectionState::Connecting;
        link.channel = Some(credentials.channel_name.clone());
        let generation = link.generation;

        shared.sink.publish(ChatEvent::status(STATUS_CONNECTING));

        let (tx, rx) = mpsc::channel(shared.event_capacity);
        let transport = shared.connector.open(credentials.clone(), tx);
        let pump = tokio::spawn(pump(Arc::downgrade(shared), generation, rx));
        link.active = Some(ActiveTransport {
            _transport: transport,
            pump,
        });
        tracing::info!(channel = %credentials.channel_name, generation, "chat transport started");
        Ok(())
    }

    /// Closes the current connection, if any.
    ///
    /// Idempotent: returns `false` and emits nothing when there was nothing
    /// to tear down.
    pub async fn disconnect(&self) -> bool {
        let mut link = self.shared.link.lock().await;
        if !link.state.is_active() && link.active.is_none() {
            return false;
        }
        link.generation = link.generation.wrapping_add(1);
        link.state = ConnectionState::Disconnected;
        drop(link.active.take());
        tracing::info!("chat transport disconnected on request");
        self.shared.sink.publish(ChatEvent::status(STATUS_DISCONNECTED));
        true
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.link.lock().await.state
    }

    /// Returns the connection state and channel.
    pub async fn status(&self) -> BridgeStatus {
        let link = self.shared.link.lock().await;
        BridgeStatus {
            state: link.state,
            channel: link.channel.clone(),
        }
    }
}

impl Shared {
    /// Applies one transport event. Returns `false` once the pump should
    /// stop.
    async fn apply(&self, generation: u64, event: TransportEvent) -> bool {
        let mut link = self.link.lock().await;
        if link.generation != generation {
            tracing::debug!(generation, "discarding event from stale chat transport");
            return false;
        }

        let (out, keep_going, retired) = match event {
            TransportEvent::Connected => {
                link.state = ConnectionState::Connected;
                (ChatEvent::status(STATUS_CONNECTED), true, None)
            }
            TransportEvent::Message { display_name, text } => {
                (ChatEvent::chat(display_name, text), true, None)
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!(channel = ?link.channel, %reason, "chat transport lost");
                link.state = ConnectionState::Disconnected;
                (ChatEvent::status(STATUS_DISCONNECTED), false, link.active.take())
            }
        };
        self.sink.publish(out);
        drop(link);

        // Aborts this pump; nothing below may await.
        drop(retired);
        keep_going
    }
}

async fn pump(shared: Weak<Shared>, generation: u64, mut rx: mpsc::Receiver<TransportEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if !shared.apply(generation, event).await {
            return;
        }
    }
    // The transport dropped its sender without reporting a disconnect.
    if let Some(shared) = shared.upgrade() {
        let _ = shared
            .apply(
                generation,
                TransportEvent::Disconnected {
                    reason: "transport ended".to_string(),
                },
            )
            .await;
    }
}
