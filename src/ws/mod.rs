//! WebSocket layer: viewer connections, message types, upgrade handlers.
//!
//! Viewers connect to `/ws` (default tenant) or `/ws/{tenant}` and receive
//! every chat event of that tenant as a `chat_message`.

pub mod connection;
pub mod handler;
pub mod messages;
