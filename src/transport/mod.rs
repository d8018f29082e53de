//! External chat transport: the managed streaming connection to Twitch.
//!
//! The bridge only sees the [`Connector`] seam. Each call to
//! [`Connector::open`] starts one connection and returns an owned
//! [`TransportHandle`]; dropping the handle tears that connection down.
//! Replacing a connection is therefore "open a new handle, swap it in,
//! drop the old one", with no handler registration to undo.

pub mod irc;
pub mod throttle;
pub mod twitch;

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::Credentials;

pub use irc::IrcMessage;
pub use throttle::Throttle;
pub use twitch::{TwitchIrcConfig, TwitchIrcConnector};

/// Event reported by a running transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The external service accepted the connection.
    Connected,
    /// A chat message arrived.
    Message {
        /// Sender's display name.
        display_name: String,
        /// Message body.
        text: String,
    },
    /// The connection ended. Always the last event of a transport.
    Disconnected {
        /// Human-readable cause, for logs.
        reason: String,
    },
}

/// Opens connections to an external chat service.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Starts a connection using `credentials`, reporting lifecycle and
    /// messages on `events`.
    ///
    /// Must not block: the connection is driven by a spawned task owned by
    /// the returned handle.
    fn open(
        &self,
        credentials: Credentials,
        events: mpsc::Sender<TransportEvent>,
    ) -> TransportHandle;
}

/// Owned handle to one running transport task.
///
/// Dropping the handle aborts the task, which closes its socket.
#[derive(Debug)]
pub struct TransportHandle {
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Spawns `future` on the current runtime and takes ownership of it.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }

    /// Returns `true` once the transport task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
