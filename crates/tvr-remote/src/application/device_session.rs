//! DeviceSessionUseCase: connect to one display and drive it.
//!
//! # Connection lifecycle (for beginners)
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──handshake ok──► Connected
//!      ▲                          │                            │
//!      └──── handshake failed ────┘                            │
//!      └──────────── disconnect() / transport failure ─────────┘
//! ```
//!
//! - `Connecting` is exclusive: a second `connect()` while one is in flight
//!   fails fast with [`ConnectError::AlreadyConnecting`].
//! - `connect()` while `Connected` replaces the current device: the old
//!   session is closed first.
//! - A command that fails at the transport level (timeout, reset) ends the
//!   session.  A command the device merely refuses does not.
//! - Nothing reconnects implicitly.  Commands while disconnected fail with
//!   [`CommandError::NotConnected`] without touching the network.
//!
//! # Tokens
//!
//! The first connect to a display raises a pairing prompt on the screen.
//! Once the user accepts, the device issues an [`AuthToken`] which is stored
//! per address and presented on every later connect.  If the device no
//! longer accepts the stored token, it is discarded and the connect is retried
//! once without a token (the prompt appears again).

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use tvr_core::{
    resolve_app_candidates, AppDescriptor, AppId, AuthToken, CommandKind, ControlProtocol,
    DeviceIdentity, ProtocolError, SessionHandle, SessionState,
};

use super::session_store::SessionStore;

/// Name used when a device does not report one.
pub const FALLBACK_DISPLAY_NAME: &str = "Smart TV";

/// Default bound on opening a session (includes the user's time to accept a
/// pairing prompt).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(7000);
/// Default bound on a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(3000);

/// Why a connect failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("device at {address} is unreachable: {reason}")]
    Unreachable { address: Ipv4Addr, reason: String },

    #[error("device at {address} refused pairing: {reason}")]
    AuthRejected { address: Ipv4Addr, reason: String },

    #[error("device at {0} rejected the auth token")]
    TokenRejected(Ipv4Addr),

    #[error("a connect is already in progress")]
    AlreadyConnecting,

    #[error("no device has been connected before")]
    NoRememberedDevice,
}

impl ConnectError {
    fn from_protocol(address: Ipv4Addr, err: ProtocolError) -> Self {
        match err {
            ProtocolError::AuthRejected(reason) | ProtocolError::Rejected(reason) => {
                Self::AuthRejected { address, reason }
            }
            ProtocolError::TokenRejected => Self::TokenRejected(address),
            other => Self::Unreachable {
                address,
                reason: other.to_string(),
            },
        }
    }
}

/// Why a command or query failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("not connected to a device")]
    NotConnected,

    /// The device refused the request.  The session stays open.
    #[error("device rejected the request: {0}")]
    Rejected(String),

    /// The session broke.  State is now `Disconnected`.
    #[error("connection to the device failed: {0}")]
    TransportFailure(String),

    #[error("no application matching '{0}'")]
    AppNotFound(String),
}

/// Failures of read-only queries share the command error shape.
pub type QueryError = CommandError;

/// Timeouts applied to protocol calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub connect: Duration,
    pub command: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            command: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Runs `call` under `limit`, turning expiry into [`ProtocolError::Timeout`].
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ProtocolError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ProtocolError::Timeout(limit)))
}

/// Resets a `Connecting` state if the connect future is dropped before it
/// settles.
struct ConnectingGuard<'a> {
    store: &'a SessionStore,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.fail_connect("connect cancelled");
        }
    }
}

/// An opened device session that is closed unless it is handed over.
///
/// If the owning future is dropped first, the close moves to a detached task
/// so the device does not keep a half-open session.
struct OpenedSession {
    protocol: Arc<dyn ControlProtocol>,
    handle: SessionHandle,
    close_timeout: Duration,
    armed: bool,
}

impl OpenedSession {
    fn new(protocol: Arc<dyn ControlProtocol>, handle: SessionHandle, close_timeout: Duration) -> Self {
        Self {
            protocol,
            handle,
            close_timeout,
            armed: true,
        }
    }

    fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Hands the session over to the caller; it is no longer closed on drop.
    fn keep(mut self) -> SessionHandle {
        self.armed = false;
        self.handle.clone()
    }

    async fn close(mut self) {
        if let Err(e) = bounded(self.close_timeout, self.protocol.close_session(&self.handle)).await {
            debug!("closing session with {} failed: {e}", self.handle.address());
        }
        self.armed = false;
    }
}

impl Drop for OpenedSession {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime to close abandoned session with {}", self.handle.address());
            return;
        };
        debug!("closing abandoned session with {}", self.handle.address());
        let protocol = Arc::clone(&self.protocol);
        let handle = self.handle.clone();
        let limit = self.close_timeout;
        runtime.spawn(async move {
            let _ = tokio::time::timeout(limit, protocol.close_session(&handle)).await;
        });
    }
}

/// The connect / command / disconnect use case.
pub struct DeviceSession {
    protocol: Arc<dyn ControlProtocol>,
    store: Arc<SessionStore>,
    timeouts: SessionTimeouts,
}

impl DeviceSession {
    pub fn new(
        protocol: Arc<dyn ControlProtocol>,
        store: Arc<SessionStore>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            protocol,
            store,
            timeouts,
        }
    }

    /// Non-blocking snapshot of the session state.
    pub fn status(&self) -> SessionState {
        self.store.status()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // ── Connect ───────────────────────────────────────────────────────────────

    /// Opens an authenticated session with the device at `address`.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::AlreadyConnecting`] if another connect is in flight.
    /// - [`ConnectError::Unreachable`], [`ConnectError::AuthRejected`] or
    ///   [`ConnectError::TokenRejected`] if the handshake fails.  The state is
    ///   then `Disconnected` with the reason, and the remembered device is
    ///   left untouched.
    pub async fn connect(&self, address: Ipv4Addr) -> Result<DeviceIdentity, ConnectError> {
        // No await between claiming `Connecting` and arming the guard.
        let replaced = self.store.begin_connect(address)?;
        let mut guard = ConnectingGuard {
            store: &self.store,
            armed: true,
        };

        if let Some(old) = replaced {
            info!("replacing session with {}", old.address());
            self.close_quietly(old).await;
        }

        let outcome = match self.establish(address).await {
            Ok((opened, identity)) => {
                self.store.complete_connect(opened.keep(), identity.clone());
                Ok(identity)
            }
            Err(e) => {
                warn!("connect to {address} failed: {e}");
                self.store.fail_connect(e.to_string());
                Err(e)
            }
        };
        guard.armed = false;
        outcome
    }

    /// Connects to the remembered device.
    ///
    /// # Errors
    ///
    /// [`ConnectError::NoRememberedDevice`] when no connect ever succeeded,
    /// otherwise as [`DeviceSession::connect`].
    pub async fn reconnect(&self) -> Result<DeviceIdentity, ConnectError> {
        let address = self
            .store
            .remembered()
            .address
            .ok_or(ConnectError::NoRememberedDevice)?;
        self.connect(address).await
    }

    async fn establish(&self, address: Ipv4Addr) -> Result<(OpenedSession, DeviceIdentity), ConnectError> {
        let token = self.store.load_token(address);

        let opened = match self.open(address, token.as_ref()).await {
            Err(ProtocolError::TokenRejected) if token.is_some() => {
                warn!("stored token for {address} was rejected; pairing again");
                self.store.discard_token(address);
                self.open(address, None).await
            }
            other => other,
        };
        let handle = opened.map_err(|e| ConnectError::from_protocol(address, e))?;
        let opened = OpenedSession::new(Arc::clone(&self.protocol), handle, self.timeouts.command);

        if let Some(issued) = opened.handle().issued_token() {
            self.store.store_token(address, issued);
        }

        let info = match bounded(self.timeouts.connect, self.protocol.device_info(opened.handle())).await {
            Ok(info) => info,
            Err(e) => {
                opened.close().await;
                return Err(ConnectError::from_protocol(address, e));
            }
        };
        let name = if info.has_name() {
            info.display_name.trim().to_string()
        } else {
            FALLBACK_DISPLAY_NAME.to_string()
        };

        Ok((opened, DeviceIdentity::new(address, name)))
    }

    async fn open(&self, address: Ipv4Addr, token: Option<&AuthToken>) -> Result<SessionHandle, ProtocolError> {
        debug!("opening session with {address} (token: {})", token.is_some());
        bounded(self.timeouts.connect, self.protocol.open_session(address, token)).await
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Sends a key press or app launch over the open session.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NotConnected`] when there is no session; no protocol
    ///   call is made.
    /// - [`CommandError::TransportFailure`] on timeout or a broken connection;
    ///   the session is ended.
    /// - [`CommandError::Rejected`] when the device refuses the command.
    pub async fn send_command(&self, command: &CommandKind) -> Result<(), CommandError> {
        let handle = self.require_session()?;
        debug!("sending {command}");
        let result = match command {
            CommandKind::Key(key) => {
                bounded(self.timeouts.command, self.protocol.send_key(&handle, key)).await
            }
            CommandKind::LaunchApp(app) => {
                bounded(self.timeouts.command, self.protocol.launch_app(&handle, app)).await
            }
        };
        self.settle(&handle, result).await
    }

    /// Lists the applications installed on the connected device.
    ///
    /// # Errors
    ///
    /// Same classification as [`DeviceSession::send_command`].
    pub async fn list_applications(&self) -> Result<Vec<AppDescriptor>, QueryError> {
        let handle = self.require_session()?;
        let result = bounded(self.timeouts.command, self.protocol.list_apps(&handle)).await;
        self.settle(&handle, result).await
    }

    /// Launches an application by user-facing name (e.g. "netflix").
    ///
    /// Candidates come from the installed list first, then from the built-in
    /// catalogue of well-known ids.  Each is tried in turn; the first launch
    /// the device accepts wins.  Returns the id that launched.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AppNotFound`] when no candidate launches.
    /// - [`CommandError::TransportFailure`] stops the search immediately.
    pub async fn launch_app_by_name(&self, query: &str) -> Result<AppId, CommandError> {
        let handle = self.require_session()?;

        let listed = bounded(self.timeouts.command, self.protocol.list_apps(&handle)).await;
        let installed = match self.settle(&handle, listed).await {
            Ok(apps) => apps,
            Err(e @ CommandError::TransportFailure(_)) => return Err(e),
            Err(e) => {
                warn!("could not list installed apps, using catalogue only: {e}");
                Vec::new()
            }
        };

        for candidate in resolve_app_candidates(query, &installed) {
            let launched =
                bounded(self.timeouts.command, self.protocol.launch_app(&handle, &candidate)).await;
            match self.settle(&handle, launched).await {
                Ok(()) => {
                    info!("launched '{query}' as {candidate}");
                    return Ok(candidate);
                }
                Err(e @ CommandError::TransportFailure(_)) => return Err(e),
                Err(e) => debug!("candidate {candidate} for '{query}' did not launch: {e}"),
            }
        }
        Err(CommandError::AppNotFound(query.trim().to_string()))
    }

    /// Closes the open session.  Idempotent.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.store.disconnect() {
            self.close_quietly(handle).await;
        }
    }

    fn require_session(&self) -> Result<SessionHandle, CommandError> {
        self.store.active_handle().ok_or(CommandError::NotConnected)
    }

    /// Classifies a protocol result and ends the session on transport failure.
    async fn settle<T>(&self, handle: &SessionHandle, result: Result<T, ProtocolError>) -> Result<T, CommandError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_transport() => {
                let reason = e.to_string();
                if let Some(lost) = self.store.end_session(handle.id(), reason.clone()) {
                    self.close_quietly(lost).await;
                }
                Err(CommandError::TransportFailure(reason))
            }
            Err(e) => Err(CommandError::Rejected(e.to_string())),
        }
    }

    async fn close_quietly(&self, handle: SessionHandle) {
        OpenedSession::new(Arc::clone(&self.protocol), handle, self.timeouts.command)
            .close()
            .await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_store::{MockConfigRepository, MockTokenRepository};
    use crate::infrastructure::device_control::mock::{FakeCall, FakeDeviceNetwork};
    use tvr_core::{KeyCode, PersistedConfig};

    fn tv() -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 5)
    }

    /// Store with permissive mocks: nothing remembered, no stored tokens,
    /// every save succeeds.
    fn permissive_store() -> Arc<SessionStore> {
        let mut config = MockConfigRepository::new();
        config.expect_load().returning(|| Ok(PersistedConfig::default()));
        config.expect_save().returning(|_| Ok(()));
        let mut tokens = MockTokenRepository::new();
        tokens.expect_load().returning(|_| Ok(None));
        tokens.expect_save().returning(|_, _| Ok(()));
        tokens.expect_discard().returning(|_| Ok(()));
        Arc::new(SessionStore::new(Arc::new(config), Arc::new(tokens)))
    }

    fn session(network: &Arc<FakeDeviceNetwork>, store: Arc<SessionStore>) -> DeviceSession {
        DeviceSession::new(network.clone(), store, SessionTimeouts::default())
    }

    fn key(raw: &str) -> CommandKind {
        CommandKind::Key(KeyCode::parse(raw).unwrap())
    }

    #[tokio::test]
    async fn test_connect_reports_device_name() {
        // Arrange
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());

        // Act
        let identity = session.connect(tv()).await.unwrap();

        // Assert
        assert_eq!(identity.display_name(), "LivingRoomTV");
        assert_eq!(session.status().identity().map(|i| i.address()), Some(tv()));
    }

    #[tokio::test]
    async fn test_connect_to_missing_device_is_unreachable() {
        let network = Arc::new(FakeDeviceNetwork::new());
        let session = session(&network, permissive_store());

        let err = session.connect(tv()).await.unwrap_err();

        assert!(matches!(err, ConnectError::Unreachable { .. }));
        assert!(session.status().reason().is_some());
    }

    #[tokio::test]
    async fn test_refused_pairing_is_auth_rejected() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.refuse_pairing(tv());
        let session = session(&network, permissive_store());

        let err = session.connect(tv()).await.unwrap_err();

        assert!(matches!(err, ConnectError::AuthRejected { .. }));
    }

    #[tokio::test]
    async fn test_blank_device_name_uses_fallback() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "  ");
        let session = session(&network, permissive_store());

        let identity = session.connect(tv()).await.unwrap();

        assert_eq!(identity.display_name(), FALLBACK_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn test_failed_connect_never_saves_config() {
        // Arrange: no expect_save, so a save would panic the test
        let mut config = MockConfigRepository::new();
        config.expect_load().returning(|| Ok(PersistedConfig::default()));
        let mut tokens = MockTokenRepository::new();
        tokens.expect_load().returning(|_| Ok(None));
        let store = Arc::new(SessionStore::new(Arc::new(config), Arc::new(tokens)));
        let network = Arc::new(FakeDeviceNetwork::new());
        let session = session(&network, store);

        // Act
        let result = session.connect(tv()).await;

        // Assert
        assert!(result.is_err());
        assert!(session.store().remembered().is_empty());
    }

    #[tokio::test]
    async fn test_stored_token_is_presented() {
        // Arrange
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.accept_token(tv(), "known-token");
        let mut config = MockConfigRepository::new();
        config.expect_load().returning(|| Ok(PersistedConfig::default()));
        config.expect_save().returning(|_| Ok(()));
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_load()
            .returning(|_| Ok(Some(AuthToken::new("known-token"))));
        tokens.expect_save().never();
        let store = Arc::new(SessionStore::new(Arc::new(config), Arc::new(tokens)));
        let session = session(&network, store);

        // Act
        session.connect(tv()).await.unwrap();

        // Assert
        assert!(network.calls().contains(&FakeCall::Open {
            address: tv(),
            token: Some("known-token".to_string()),
        }));
    }

    #[tokio::test]
    async fn test_rejected_token_is_discarded_and_replaced() {
        // Arrange: device no longer knows the stored token
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let mut config = MockConfigRepository::new();
        config.expect_load().returning(|| Ok(PersistedConfig::default()));
        config.expect_save().returning(|_| Ok(()));
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_load()
            .returning(|_| Ok(Some(AuthToken::new("stale"))));
        tokens.expect_discard().times(1).returning(|_| Ok(()));
        tokens
            .expect_save()
            .withf(|_, token| token.as_str() != "stale")
            .times(1)
            .returning(|_, _| Ok(()));
        let store = Arc::new(SessionStore::new(Arc::new(config), Arc::new(tokens)));
        let session = session(&network, store);

        // Act
        let result = session.connect(tv()).await;

        // Assert
        assert!(result.is_ok());
        let opens = network
            .calls()
            .into_iter()
            .filter(|c| matches!(c, FakeCall::Open { .. }))
            .count();
        assert_eq!(opens, 2);
    }

    #[tokio::test]
    async fn test_send_command_while_disconnected_makes_no_call() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());

        let err = session.send_command(&key("KEY_HOME")).await.unwrap_err();

        assert_eq!(err, CommandError::NotConnected);
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_key_reaches_device() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        session.send_command(&key("KEY_VOLUP")).await.unwrap();

        assert_eq!(network.keys_received(tv()), vec!["KEY_VOLUP".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_ends_session() {
        // Arrange
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();
        network.fail_next_call(ProtocolError::Transport("connection reset".into()));

        // Act
        let err = session.send_command(&key("KEY_HOME")).await.unwrap_err();

        // Assert
        assert!(matches!(err, CommandError::TransportFailure(_)));
        assert!(matches!(session.status(), SessionState::Disconnected { .. }));
        assert_eq!(
            session.send_command(&key("KEY_HOME")).await,
            Err(CommandError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_rejected_command_keeps_session() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();
        network.fail_next_call(ProtocolError::Rejected("busy".into()));

        let err = session.send_command(&key("KEY_HOME")).await.unwrap_err();

        assert!(matches!(err, CommandError::Rejected(_)));
        assert!(session.status().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_timeout_is_transport_failure() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();
        network.set_command_latency(Duration::from_secs(10));

        let err = session.send_command(&key("KEY_HOME")).await.unwrap_err();

        assert!(matches!(err, CommandError::TransportFailure(_)));
        assert!(!session.status().is_connected());
    }

    #[tokio::test]
    async fn test_launch_by_name_prefers_installed_app() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.install_app(tv(), "A-100", "Netflix");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        let launched = session.launch_app_by_name("netflix").await.unwrap();

        assert_eq!(launched.as_str(), "A-100");
    }

    #[tokio::test]
    async fn test_launch_by_name_falls_back_to_catalogue() {
        // Arrange: app list is empty but the device accepts a well-known id
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.accept_launch(tv(), "111299001912");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        // Act
        let launched = session.launch_app_by_name("YouTube").await.unwrap();

        // Assert
        assert_eq!(launched.as_str(), "111299001912");
    }

    #[tokio::test]
    async fn test_launch_unknown_app_is_not_found() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        let err = session.launch_app_by_name("solitaire").await.unwrap_err();

        assert_eq!(err, CommandError::AppNotFound("solitaire".to_string()));
        assert!(session.status().is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_closes_session_and_is_idempotent() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        session.disconnect().await;
        session.disconnect().await;

        assert_eq!(session.status(), SessionState::default());
        let closes = network
            .calls()
            .into_iter()
            .filter(|c| matches!(c, FakeCall::Close { .. }))
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_reconnect_without_remembered_device_fails() {
        let network = Arc::new(FakeDeviceNetwork::new());
        let session = session(&network, permissive_store());

        assert_eq!(
            session.reconnect().await,
            Err(ConnectError::NoRememberedDevice)
        );
    }

    #[tokio::test]
    async fn test_connect_while_connected_replaces_device() {
        // Arrange
        let other = Ipv4Addr::new(10, 0, 0, 9);
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.add_device(other, "Bedroom");
        let session = session(&network, permissive_store());
        session.connect(tv()).await.unwrap();

        // Act
        let identity = session.connect(other).await.unwrap();

        // Assert
        assert_eq!(identity.display_name(), "Bedroom");
        assert!(network.calls().contains(&FakeCall::Close { address: tv() }));
    }

    #[tokio::test]
    async fn test_connect_dropped_after_first_poll_can_be_retried() {
        // Arrange: the open stalls, so the first poll leaves the connect
        // parked inside the handshake
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.set_open_latency(Duration::from_secs(5));
        let session = session(&network, permissive_store());

        // Act
        let mut attempt = tokio_test::task::spawn(session.connect(tv()));
        tokio_test::assert_pending!(attempt.poll());
        drop(attempt);
        let after_cancel = session.status();
        network.set_open_latency(Duration::ZERO);
        let retry = session.connect(tv()).await;

        // Assert
        assert!(!after_cancel.is_connecting());
        assert_eq!(retry.unwrap().display_name(), "LivingRoomTV");
        assert!(session.status().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_cancelled_after_open_closes_the_session() {
        // Arrange: the session opens, then device_info stalls
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.set_command_latency(Duration::from_secs(5));
        let session = session(&network, permissive_store());

        // Act
        let attempt = tokio::time::timeout(Duration::from_millis(50), session.connect(tv())).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Assert
        assert!(attempt.is_err());
        assert_eq!(network.open_session_count(), 0);
        assert!(network.calls().contains(&FakeCall::Close { address: tv() }));
        network.set_command_latency(Duration::ZERO);
        assert!(session.connect(tv()).await.is_ok());
        assert_eq!(network.open_session_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_connect_does_not_stay_connecting() {
        let network = Arc::new(FakeDeviceNetwork::new());
        network.add_device(tv(), "LivingRoomTV");
        network.set_open_latency(Duration::from_secs(5));
        let session = session(&network, permissive_store());

        let attempt = tokio::time::timeout(Duration::from_millis(20), session.connect(tv())).await;

        assert!(attempt.is_err());
        assert_eq!(session.status().reason(), Some("connect cancelled"));
    }
}
