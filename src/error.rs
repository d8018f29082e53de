//! Relay error types.
//!
//! [`ConnectError`], [`TransportError`] and [`DeliveryError`] cover the
//! bridge itself. [`RelayError`] is the HTTP-facing error: each variant
//! maps to a specific status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "tenant not found: somechannel"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure returned synchronously by [`crate::service::ChatBridge::connect`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// A credential field was empty. No network action was taken.
    #[error("invalid credentials: {field} is empty")]
    InvalidCredentials {
        /// Name of the first offending field.
        field: &'static str,
    },
}

/// Loss or refusal of the external chat connection.
///
/// Never fatal: the bridge reports it as a status event and falls back to
/// [`crate::domain::ConnectionState::Disconnected`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The WebSocket could not be opened.
    #[error("failed to open chat socket: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    /// The handshake did not finish within the configured bound.
    #[error("chat handshake timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The chat service rejected the credentials.
    #[error("authentication rejected: {0}")]
    AuthenticationFailed(String),

    /// The chat service asked the client to reconnect.
    #[error("server requested reconnect")]
    ReconnectRequested,

    /// The socket closed, with the peer's reason when one was given.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Per-session delivery failure. Logged and dropped, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The session's queue is full; this copy of the event was dropped.
    #[error("session queue full")]
    Lagging,
    /// The session's receiver is gone; the session is no longer live.
    #[error("session closed")]
    Closed,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Tenant identifier failed validation.
    #[error("invalid tenant: {0}")]
    InvalidTenant(String),

    /// No tenant with the given identifier is registered.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    /// The registry already holds the configured maximum of tenants.
    #[error("tenant limit of {0} reached")]
    TenantLimitReached(usize),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidTenant(_) => 1001,
            Self::TenantNotFound(_) => 2001,
            Self::TenantLimitReached(_) => 2002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidTenant(_) => StatusCode::BAD_REQUEST,
            Self::TenantNotFound(_) => StatusCode::NOT_FOUND,
            Self::TenantLimitReached(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_status_mapping() {
        assert_eq!(
            RelayError::InvalidTenant("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::TenantNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::TenantLimitReached(4).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(RelayError::TenantNotFound("x".into()).error_code(), 2001);
    }

    #[test]
    fn into_response_sets_status() {
        let response = RelayError::TenantNotFound("chan".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn connect_error_names_field() {
        let err = ConnectError::InvalidCredentials {
            field: "access_token",
        };
        assert_eq!(err.to_string(), "invalid credentials: access_token is empty");
    }
}
