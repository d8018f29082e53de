//! # twitch-relay
//!
//! Relays Twitch chat to browser viewers over WebSocket.
//!
//! A viewer sends a `connect_to_twitch` command with bot credentials; the
//! tenant's chat bridge opens an IRC-over-WebSocket connection to Twitch
//! and every chat line is pushed to every viewer of that tenant. The Twitch
//! wire protocol lives behind the [`transport::Connector`] seam.
//!
//! ## Architecture
//!
//! ```text
//! Viewers (WebSocket)          REST clients
//!     │                             │
//!     ├── WS Handler (ws/)          ├── REST Handlers (api/)
//!     │                             │
//!     └──────── ChannelRegistry (service/) ────────┘
//!                    │  one per tenant
//!               Broadcaster ── SessionSet (domain/)
//!                    │
//!               ChatBridge
//!                    │
//!          TwitchIrcConnector (transport/)
//!                    │
//!        wss://irc-ws.chat.twitch.tv
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod transport;
pub mod ws;
