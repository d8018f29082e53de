//! Viewer sessions and the set they are registered in.
//!
//! Each [`Session`] owns the receiving end of a bounded queue; the
//! [`SessionSet`] keeps the sending ends. Delivery is a non-blocking
//! `try_send`, so a slow or dead viewer only ever loses its own copy of an
//! event.
//!
//! The set is guarded by a `std::sync::RwLock`: it is never held across an
//! `.await`, and dispatch runs on the transport pump where blocking on an
//! async lock is not an option.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{ChatEvent, SessionId};
use crate::error::DeliveryError;

/// One viewer's push channel, as held by the viewer's connection task.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    live: Arc<AtomicBool>,
    receiver: mpsc::Receiver<ChatEvent>,
}

impl Session {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns `false` once the session was unregistered or replaced.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Waits for the next event. Returns `None` once the session has been
    /// removed from its set and the queue is drained.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.receiver.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<ChatEvent> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug)]
struct SessionSlot {
    sender: mpsc::Sender<ChatEvent>,
    live: Arc<AtomicBool>,
}

impl SessionSlot {
    fn deliver(&self, event: ChatEvent) -> Result<(), DeliveryError> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::Lagging),
            Err(TrySendError::Closed(_)) => {
                self.live.store(false, Ordering::Release);
                Err(DeliveryError::Closed)
            }
        }
    }

    fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Outcome of one [`SessionSet::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sessions that received the event.
    pub delivered: usize,
    /// Sessions whose queue was full; their copy was dropped.
    pub lagged: usize,
    /// Sessions found closed and removed.
    pub removed: usize,
}

/// The set of currently registered viewer sessions.
#[derive(Debug)]
pub struct SessionSet {
    queue_capacity: usize,
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
}

impl SessionSet {
    /// Creates an empty set. Each session queue holds `queue_capacity`
    /// events.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a session. An existing session with the same id is
    /// replaced and its queue closed.
    pub fn register(&self, id: SessionId) -> Session {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let live = Arc::new(AtomicBool::new(true));
        let slot = SessionSlot {
            sender,
            live: Arc::clone(&live),
        };
        let previous = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, slot);
        if let Some(previous) = previous {
            tracing::debug!(session_id = %id, "replacing existing session");
            previous.retire();
        }
        Session { id, live, receiver }
    }

    /// Removes a session. Returns `false` if it was not registered.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(slot) => {
                slot.retire();
                true
            }
            None => false,
        }
    }

    /// Delivers `event` to every registered session.
    ///
    /// A full queue drops that session's copy; a closed queue removes the
    /// session. Neither affects delivery to the others.
    pub fn dispatch(&self, event: &ChatEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut closed = Vec::new();
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            for (id, slot) in sessions.iter() {
                match slot.deliver(event.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(DeliveryError::Lagging) => {
                        report.lagged += 1;
                        tracing::warn!(session_id = %id, "session lagging, event dropped");
                    }
                    Err(DeliveryError::Closed) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            for id in closed {
                // Re-check: the id may have been re-registered meanwhile.
                if sessions.get(&id).is_some_and(|slot| slot.sender.is_closed()) {
                    sessions.remove(&id);
                    report.removed += 1;
                    tracing::debug!(session_id = %id, "removed closed session");
                }
            }
        }
        report
    }

    /// Delivers `event` to one session only.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] if the session is unknown or
    /// closed, and [`DeliveryError::Lagging`] if its queue is full.
    pub fn deliver_to(&self, id: SessionId, event: ChatEvent) -> Result<(), DeliveryError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(&id)
            .ok_or(DeliveryError::Closed)
            .and_then(|slot| slot.deliver(event))
    }

    /// Removes sessions whose receiving side is gone. Returns how many
    /// were removed.
    pub fn prune_closed(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.sender.is_closed());
        before - sessions.len()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every session.
    pub fn clear(&self) {
        let drained: Vec<SessionSlot> = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in &drained {
            slot.retire();
        }
    }
}
