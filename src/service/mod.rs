//! Service layer: the chat bridge, the per-tenant broadcaster, and the
//! tenant registry.
//!
//! [`ChatBridge`] owns the external connection, [`Broadcaster`] owns the
//! viewer sessions and one bridge, and [`ChannelRegistry`] maps tenant ids
//! to broadcasters.

pub mod broadcaster;
pub mod channel_registry;
pub mod chat_bridge;

pub use broadcaster::{Broadcaster, BroadcasterSettings};
pub use channel_registry::{ChannelRegistry, ChannelSummary};
pub use chat_bridge::{BridgeStatus, ChatBridge, EventSink};
