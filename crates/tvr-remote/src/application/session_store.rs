//! SessionStore: the single source of truth for "which device are we talking
//! to right now".
//!
//! The store owns three things:
//!
//! - the [`SessionState`], held in a `tokio::sync::watch` channel so status
//!   queries never wait on a lock and UIs can subscribe to changes;
//! - the [`SessionHandle`] of the open session, if any;
//! - the [`PersistedConfig`] (last connected device), loaded once at
//!   construction and written only after a successful connect.
//!
//! It is also the only component that touches the [`ConfigRepository`] and the
//! [`TokenRepository`].  Storage failures are logged and swallowed here: a
//! full disk must never turn a working connection into a failed one.
//!
//! # Stale failures
//!
//! A command that fails with a transport error ends the session it was sent
//! on, identified by the handle's id.  If the user has reconnected in the
//! meantime the ids differ and the late failure is ignored.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tvr_core::{AuthToken, DeviceIdentity, PersistedConfig, SessionHandle, SessionState};
use uuid::Uuid;

use super::device_session::ConnectError;

/// Error type for the persistence repositories.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value could not be serialized for storage.
    #[error("failed to serialize: {0}")]
    Serialize(String),
}

/// Loads and saves the last connected device.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigRepository: Send + Sync {
    /// Returns the stored config, or the default when nothing is stored yet.
    fn load(&self) -> Result<PersistedConfig, StorageError>;
    fn save(&self, config: &PersistedConfig) -> Result<(), StorageError>;
}

/// Per-address storage of device-issued auth tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenRepository: Send + Sync {
    fn load(&self, address: Ipv4Addr) -> Result<Option<AuthToken>, StorageError>;
    fn save(&self, address: Ipv4Addr, token: &AuthToken) -> Result<(), StorageError>;
    /// Removes the token for `address`.  Removing a missing token is not an
    /// error.
    fn discard(&self, address: Ipv4Addr) -> Result<(), StorageError>;
}

/// Process-wide holder of the single device session.
///
/// Every state transition runs inside one synchronous critical section on
/// `active`, with no `.await` between claiming and publishing.  A caller
/// whose future is dropped therefore either made the whole transition or
/// none of it.
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    active: Mutex<Option<SessionHandle>>,
    remembered: Mutex<PersistedConfig>,
    config_repo: Arc<dyn ConfigRepository>,
    token_repo: Arc<dyn TokenRepository>,
}

impl SessionStore {
    /// Creates the store and loads the remembered device.
    ///
    /// An unreadable config file is logged and treated as "no device
    /// remembered".
    pub fn new(config_repo: Arc<dyn ConfigRepository>, token_repo: Arc<dyn TokenRepository>) -> Self {
        let remembered = match config_repo.load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("could not load remembered device, starting fresh: {e}");
                PersistedConfig::default()
            }
        };
        if let Some(address) = remembered.address {
            debug!("remembered device: {address}");
        }
        let (state, _) = watch::channel(SessionState::default());

        Self {
            state,
            active: Mutex::new(None),
            remembered: Mutex::new(remembered),
            config_repo,
            token_repo,
        }
    }

    /// Locks the active handle.  A poisoned lock still holds a consistent
    /// `Option`, so it is recovered rather than propagated.
    fn active(&self) -> MutexGuard<'_, Option<SessionHandle>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── State ─────────────────────────────────────────────────────────────────

    /// Snapshot of the current state.  Never blocks.
    pub fn status(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The device remembered from the last successful connect.
    pub fn remembered(&self) -> PersistedConfig {
        self.remembered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Handle of the open session, if connected.
    pub fn active_handle(&self) -> Option<SessionHandle> {
        self.active().clone()
    }

    /// Atomically moves to `Connecting`.
    ///
    /// Returns the handle of the session being replaced, if any, so the caller
    /// can close it.
    ///
    /// # Errors
    ///
    /// [`ConnectError::AlreadyConnecting`] when another connect is in flight.
    pub fn begin_connect(&self, address: Ipv4Addr) -> Result<Option<SessionHandle>, ConnectError> {
        let mut active = self.active();
        let claimed = self.state.send_if_modified(|state| {
            if state.is_connecting() {
                false
            } else {
                *state = SessionState::Connecting { address };
                true
            }
        });
        if !claimed {
            return Err(ConnectError::AlreadyConnecting);
        }
        info!("connecting to {address}");
        Ok(active.take())
    }

    /// Records a successful connect and persists the device.
    pub fn complete_connect(&self, handle: SessionHandle, identity: DeviceIdentity) {
        {
            let mut active = self.active();
            *active = Some(handle);
            self.state.send_replace(SessionState::Connected(identity.clone()));
        }
        info!("connected to {} at {}", identity.display_name(), identity.address());

        let cfg = PersistedConfig::from_identity(&identity);
        if let Err(e) = self.config_repo.save(&cfg) {
            warn!("connected, but could not remember the device: {e}");
        }
        *self.remembered.lock().unwrap_or_else(|e| e.into_inner()) = cfg;
    }

    /// Records a failed or abandoned connect.
    ///
    /// Synchronous so it can run from a `Drop` impl.
    pub fn fail_connect(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let _active = self.active();
        self.state.send_if_modified(|state| {
            if state.is_connecting() {
                *state = SessionState::Disconnected {
                    reason: Some(reason.clone()),
                };
                true
            } else {
                false
            }
        });
    }

    /// Ends the session identified by `session_id` after a fatal failure.
    ///
    /// Returns the removed handle, or `None` when `session_id` is not the
    /// active session (the failure is stale and is ignored).
    pub fn end_session(&self, session_id: Uuid, reason: impl Into<String>) -> Option<SessionHandle> {
        let mut active = self.active();
        match active.as_ref() {
            Some(handle) if handle.id() == session_id => {
                let handle = active.take();
                let reason = reason.into();
                warn!("session lost: {reason}");
                self.state.send_replace(SessionState::Disconnected { reason: Some(reason) });
                handle
            }
            _ => {
                debug!("ignoring failure of stale session {session_id}");
                None
            }
        }
    }

    /// Ends the open session at the user's request.
    ///
    /// Returns the handle to close.  Idempotent.  A connect that is still in
    /// flight is left alone; it settles on its own.
    pub fn disconnect(&self) -> Option<SessionHandle> {
        let mut active = self.active();
        let handle = active.take();
        self.state.send_if_modified(|state| {
            if state.is_connecting() {
                false
            } else {
                let changed = *state != SessionState::Disconnected { reason: None };
                *state = SessionState::Disconnected { reason: None };
                changed
            }
        });
        drop(active);
        if handle.is_some() {
            info!("disconnected");
        }
        handle
    }

    // ── Tokens ────────────────────────────────────────────────────────────────

    pub fn load_token(&self, address: Ipv4Addr) -> Option<AuthToken> {
        match self.token_repo.load(address) {
            Ok(token) => token,
            Err(e) => {
                warn!("could not read stored token for {address}: {e}");
                None
            }
        }
    }

    pub fn store_token(&self, address: Ipv4Addr, token: &AuthToken) {
        match self.token_repo.save(address, token) {
            Ok(()) => info!("stored new auth token for {address}"),
            Err(e) => warn!("could not store auth token for {address}: {e}"),
        }
    }

    pub fn discard_token(&self, address: Ipv4Addr) {
        if let Err(e) = self.token_repo.discard(address) {
            warn!("could not discard auth token for {address}: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
