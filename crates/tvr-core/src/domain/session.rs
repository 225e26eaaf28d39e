//! Session lifecycle values.
//!
//! # Session lifecycle
//!
//! ```text
//!                 connect()                 handshake ok
//! Disconnected ─────────────►  Connecting ───────────────►  Connected
//!      ▲                           │                            │
//!      │      handshake failed     │                            │
//!      └───────────────────────────┘                            │
//!      │                                                        │
//!      └──────── disconnect() / transport failure ──────────────┘
//! ```
//!
//! There is no separate "failed" state: a failed connect goes straight back
//! to `Disconnected` and keeps the reason so the next status query can show
//! it.  The caller may retry immediately.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::device::DeviceIdentity;

/// Current state of the single device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session.  `reason` holds why the last connect or session ended, if
    /// it ended badly.
    Disconnected { reason: Option<String> },
    /// A connect to `address` is in flight.
    Connecting { address: Ipv4Addr },
    /// An authenticated session is open.
    Connected(DeviceIdentity),
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Disconnected { reason: None }
    }
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. })
    }

    /// The connected device, if any.
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        match self {
            Self::Connected(identity) => Some(identity),
            _ => None,
        }
    }

    /// Why the previous session or connect attempt ended.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Disconnected { reason } => reason.as_deref(),
            _ => None,
        }
    }

    /// Short lowercase label used in status payloads and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected { .. } => "disconnected",
            Self::Connecting { .. } => "connecting",
            Self::Connected(_) => "connected",
        }
    }
}

/// The last device successfully connected to.  Survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl PersistedConfig {
    pub fn from_identity(identity: &DeviceIdentity) -> Self {
        Self {
            address: Some(identity.address()),
            display_name: Some(identity.display_name().to_string()),
        }
    }

    /// `true` when no device has ever been connected.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
    }
}

/// Credential issued by a device after the user approves the pairing prompt.
///
/// Opaque to everything but the protocol adapter.  `Debug` is redacted so the
/// token never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value, for protocol adapters and token storage only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
