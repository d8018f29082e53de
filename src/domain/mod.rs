//! Domain layer: identifiers, credentials, chat events and sessions.
//!
//! These types carry no I/O of their own. The bridge and broadcaster in
//! [`crate::service`] are built on top of them.

pub mod chat_event;
pub mod connection_state;
pub mod credentials;
pub mod session;
pub mod session_id;
pub mod tenant_id;

pub use chat_event::ChatEvent;
pub use connection_state::ConnectionState;
pub use credentials::Credentials;
pub use session::{DispatchReport, Session, SessionSet};
pub use session_id::SessionId;
pub use tenant_id::TenantId;
