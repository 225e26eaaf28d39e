//! The [`ControlProtocol`] capability trait.
//!
//! # Why a trait?
//!
//! The display's remote-control channel (a websocket service with its own
//! pairing prompt and token scheme) is owned by the vendor.  The probe and
//! the session logic never speak it directly; they call this trait, and the
//! embedding application supplies the adapter.  Tests supply an in-process
//! fake instead.
//!
//! Every method is expected to be cancel-safe: callers wrap each call in
//! `tokio::time::timeout` and drop the future when it expires.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::handle::{DeviceInfo, SessionHandle};
use crate::domain::apps::{AppDescriptor, AppId};
use crate::domain::command::KeyCode;
use crate::domain::session::AuthToken;

/// Failures reported by a protocol adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The user declined the pairing prompt, or the device refused pairing.
    #[error("device refused authentication: {0}")]
    AuthRejected(String),

    /// The presented token is no longer accepted.
    #[error("stored token was rejected by the device")]
    TokenRejected,

    /// The connection could not be opened or broke mid-call.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The adapter gave up waiting for the device.
    #[error("device did not answer within {0:?}")]
    Timeout(Duration),

    /// The device understood the request and refused it.
    #[error("device rejected the request: {0}")]
    Rejected(String),

    /// The device answered with something the adapter could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// `true` for failures that mean the session itself is gone.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Remote-control capability of a smart display.
#[async_trait]
pub trait ControlProtocol: Send + Sync {
    /// Opens an authenticated session with the device at `address`.
    ///
    /// With `token = None` the device may show a pairing prompt; if the user
    /// accepts, the returned handle carries the newly issued token.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::TokenRejected`] when `token` is stale.
    /// - [`ProtocolError::AuthRejected`] when pairing was refused.
    /// - [`ProtocolError::Transport`] / [`ProtocolError::Timeout`] when the
    ///   device cannot be reached.
    async fn open_session(
        &self,
        address: Ipv4Addr,
        token: Option<&AuthToken>,
    ) -> Result<SessionHandle, ProtocolError>;

    /// Reads the device's self-description.
    async fn device_info(&self, handle: &SessionHandle) -> Result<DeviceInfo, ProtocolError>;

    /// Sends one remote key press.
    async fn send_key(&self, handle: &SessionHandle, key: &KeyCode) -> Result<(), ProtocolError>;

    /// Lists the applications installed on the device.
    async fn list_apps(&self, handle: &SessionHandle)
        -> Result<Vec<AppDescriptor>, ProtocolError>;

    /// Launches an application by id.
    async fn launch_app(&self, handle: &SessionHandle, app: &AppId) -> Result<(), ProtocolError>;

    /// Closes the session.  Closing an already-closed session is not an error.
    async fn close_session(&self, handle: &SessionHandle) -> Result<(), ProtocolError>;

    /// Asks the device at `address` who it is, without keeping a session.
    ///
    /// Used by discovery probes.  The default opens a token-less session,
    /// reads [`DeviceInfo`] and closes the session again.  Adapters for
    /// devices that expose an unauthenticated info endpoint should override
    /// this so a scan never triggers a pairing prompt.
    ///
    /// The default only releases its session if it runs to completion.
    /// Callers that may stop waiting early run it on a detached task rather
    /// than dropping it.
    async fn identify(&self, address: Ipv4Addr) -> Result<DeviceInfo, ProtocolError> {
        let handle = self.open_session(address, None).await?;
        let info = self.device_info(&handle).await;
        // Best effort: the probe result does not depend on a clean close.
        let _ = self.close_session(&handle).await;
        info
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
