//! Registry key for a relay tenant.
//!
//! A tenant is usually one Twitch channel. Each tenant owns its own
//! [`crate::service::Broadcaster`] and therefore its own chat bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Maximum accepted length of a tenant identifier.
pub const MAX_TENANT_LEN: usize = 64;

/// Validated, lower-cased tenant identifier.
///
/// Accepts ASCII letters, digits and `_`, which covers every valid Twitch
/// login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses and normalizes a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidTenant`] if the input is empty, too
    /// long, or contains characters outside `[A-Za-z0-9_]`.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RelayError::InvalidTenant("tenant id is empty".to_string()));
        }
        if trimmed.len() > MAX_TENANT_LEN {
            return Err(RelayError::InvalidTenant(format!(
                "tenant id exceeds {MAX_TENANT_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(RelayError::InvalidTenant(format!(
                "tenant id {trimmed:?} contains invalid characters"
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// The tenant served when a viewer does not name one.
    #[must_use]
    pub fn default_tenant() -> Self {
        Self("default".to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}
