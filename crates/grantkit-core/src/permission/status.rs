//! Authorization status shared by every permission kind

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one permission kind as last reported by the platform.
///
/// `NotDetermined` is the only non-terminal value. Once a handler leaves it
/// during a request cycle it never returns to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// Full access confirmed by the platform
    Granted,
    /// Access refused, explicitly or by policy restriction
    Denied,
    /// Partial or scoped access (only for kinds that support partial grants)
    Limited,
    /// No decision has been made yet
    NotDetermined,
}

impl AuthorizationStatus {
    /// Whether the platform has answered for this kind
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthorizationStatus::NotDetermined)
    }

    /// Whether some level of access is available
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::Granted | AuthorizationStatus::Limited
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Granted => "granted",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Limited => "limited",
            AuthorizationStatus::NotDetermined => "not_determined",
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for AuthorizationStatus {
    fn default() -> Self {
        AuthorizationStatus::NotDetermined
    }
}
