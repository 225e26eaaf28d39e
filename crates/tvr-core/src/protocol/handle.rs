//! Session handle issued by a [`super::ControlProtocol`].

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::session::AuthToken;

/// One open session with one device.
///
/// `id` is unique per `open_session` call.  The session layer uses it to tell
/// a failure of the current session apart from a late failure of one that has
/// already been replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    id: Uuid,
    address: Ipv4Addr,
    issued_token: Option<AuthToken>,
}

impl SessionHandle {
    /// A fresh handle for `address`.  `issued_token` is set when the device
    /// handed out a new token during this open (first pairing, or after the
    /// previous token was rejected).
    pub fn new(address: Ipv4Addr, issued_token: Option<AuthToken>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            issued_token,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn issued_token(&self) -> Option<&AuthToken> {
        self.issued_token.as_ref()
    }
}

/// What a device says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub display_name: String,
}

impl DeviceInfo {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }

    /// `true` when the device reported a usable name.  Probes treat a blank
    /// name as "not a control-capable device".
    pub fn has_name(&self) -> bool {
        !self.display_name.trim().is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
