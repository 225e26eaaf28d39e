//! Service facade: exposes the discovery and session use cases to the HTTP/UI
//! layer.
//!
//! The router and the web page are not part of this crate.  Whoever hosts the
//! UI builds one [`RemoteService`], wraps it in an `Arc`, and calls it from
//! its request handlers.  Every method returns a plain, JSON-serialisable
//! DTO.
//!
//! # Data Transfer Objects (DTOs)
//!
//! The use cases work with domain types (`Ipv4Addr`, `DeviceIdentity`,
//! `SessionState`).  The UI wants flat JSON.  DTOs are the boundary:
//!
//! - They contain only JSON-friendly fields (`String`, `bool`, `Vec`).
//! - They never contain an auth token.
//! - Failures are reported in-band (`success: false` plus a message) rather
//!   than as transport errors, so the page can always render the response.
//!
//! Any change to a DTO here must be reflected in the page's JavaScript.

use std::net::Ipv4Addr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use tvr_core::{
    subnet_for, AppDescriptor, AppId, CommandKind, ControlProtocol, DeviceIdentity, KeyCode,
    PersistedConfig, RangeError, ScanResult, SessionState,
};

use crate::application::device_session::DeviceSession;
use crate::application::scan_subnet::{HostProbe, ScanOptions, SubnetScanner};
use crate::application::session_store::SessionStore;
use crate::infrastructure::network::addressing::local_subnet;
use crate::infrastructure::network::probe::DeviceProbe;
use crate::infrastructure::storage::config::{ConfigPaths, FileConfigRepository, Settings};
use crate::infrastructure::storage::tokens::FileTokenRepository;

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One device in a scan response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub address: String,
    pub display_name: String,
}

impl From<&DeviceIdentity> for DeviceDto {
    fn from(identity: &DeviceIdentity) -> Self {
        Self {
            address: identity.address().to_string(),
            display_name: identity.display_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub devices: Vec<DeviceDto>,
    /// `true` when the scan deadline cut the sweep short.
    pub timed_out: bool,
}

impl From<&ScanResult> for ScanResponse {
    fn from(result: &ScanResult) -> Self {
        Self {
            devices: result.devices().iter().map(DeviceDto::from).collect(),
            timed_out: result.timed_out(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<DeviceDto>,
}

/// A command from the page.
///
/// ```json
/// {"key": "KEY_VOLUP"}
/// {"app_id": "111299001912"}
/// {"app_name": "netflix"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandRequest {
    Key { key: String },
    App { app_id: String },
    AppByName { app_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppsResponse {
    pub apps: Vec<AppDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connected: bool,
    /// `"disconnected"`, `"connecting"` or `"connected"`.
    pub state: String,
    pub address: Option<String>,
    pub display_name: Option<String>,
    pub reason: Option<String>,
}

impl StatusResponse {
    /// Builds the status from the live state, filling address and name from
    /// the remembered device when nothing is connected.
    pub fn from_state(state: &SessionState, remembered: &PersistedConfig) -> Self {
        let (address, display_name) = match state {
            SessionState::Connected(identity) => (
                Some(identity.address().to_string()),
                Some(identity.display_name().to_string()),
            ),
            SessionState::Connecting { address } => (Some(address.to_string()), None),
            SessionState::Disconnected { .. } => (
                remembered.address.map(|a| a.to_string()),
                remembered.display_name.clone(),
            ),
        };
        Self {
            connected: state.is_connected(),
            state: state.label().to_string(),
            address,
            display_name,
            reason: state.reason().map(str::to_string),
        }
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// The composition root handed to the HTTP/UI layer.
pub struct RemoteService {
    scanner: SubnetScanner,
    session: DeviceSession,
    scan_options: ScanOptions,
}

impl RemoteService {
    /// Wires the production stack: TCP probes, file-backed repositories in
    /// `paths`, and the caller's protocol adapter.
    pub fn new(protocol: Arc<dyn ControlProtocol>, settings: &Settings, paths: &ConfigPaths) -> Self {
        let probe = DeviceProbe::new(
            Arc::clone(&protocol),
            settings.device.control_port,
            settings.scan.handshake_timeout(),
        );
        let store = SessionStore::new(
            Arc::new(FileConfigRepository::in_dir(paths)),
            Arc::new(FileTokenRepository::in_dir(paths)),
        );
        Self::from_parts(
            Arc::new(probe),
            protocol,
            Arc::new(store),
            settings.scan.options(),
            settings,
        )
    }

    /// Wires the service from explicit parts.
    pub fn from_parts(
        probe: Arc<dyn HostProbe>,
        protocol: Arc<dyn ControlProtocol>,
        store: Arc<SessionStore>,
        scan_options: ScanOptions,
        settings: &Settings,
    ) -> Self {
        Self {
            scanner: SubnetScanner::new(probe),
            session: DeviceSession::new(protocol, store, settings.device.timeouts()),
            scan_options,
        }
    }

    /// Scans the local `/24`.
    ///
    /// The route lookup behind [`local_subnet`] uses a blocking socket, so it
    /// runs on the blocking pool.
    pub async fn scan(&self) -> ScanResponse {
        let range = match tokio::task::spawn_blocking(local_subnet).await {
            Ok(range) => range,
            Err(e) => {
                warn!("local subnet lookup failed, scanning loopback: {e}");
                subnet_for(Ipv4Addr::LOCALHOST)
            }
        };
        let result = self.scanner.scan(range, &self.scan_options).await;
        ScanResponse::from(&result)
    }

    /// Scans an explicit range such as `"192.168.1.0/24"`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when `cidr` is not a `/24` in CIDR notation.
    pub async fn scan_range(&self, cidr: &str) -> Result<ScanResponse, RangeError> {
        let result = self.scanner.scan_cidr(cidr, &self.scan_options).await?;
        Ok(ScanResponse::from(&result))
    }

    pub async fn connect(&self, address: Ipv4Addr) -> ConnectResponse {
        connect_response(self.session.connect(address).await)
    }

    /// Connects to the last successfully connected device.
    pub async fn reconnect(&self) -> ConnectResponse {
        connect_response(self.session.reconnect().await)
    }

    pub async fn send_command(&self, request: CommandRequest) -> CommandResponse {
        let command = match &request {
            CommandRequest::AppByName { app_name } => {
                return match self.session.launch_app_by_name(app_name).await {
                    Ok(id) => CommandResponse::ok(format!("Launched app: {app_name} ({id})")),
                    Err(e) => CommandResponse::err(e.to_string()),
                };
            }
            CommandRequest::Key { key } => KeyCode::parse(key).map(CommandKind::Key),
            CommandRequest::App { app_id } => AppId::parse(app_id).map(CommandKind::LaunchApp),
        };
        let command = match command {
            Ok(command) => command,
            Err(e) => return CommandResponse::err(e.to_string()),
        };

        match self.session.send_command(&command).await {
            Ok(()) => CommandResponse::ok(match &command {
                CommandKind::Key(key) => format!("Sent key: {key}"),
                CommandKind::LaunchApp(app) => format!("Launched app: {app}"),
            }),
            Err(e) => CommandResponse::err(e.to_string()),
        }
    }

    pub async fn launch_app_by_name(&self, name: &str) -> CommandResponse {
        self.send_command(CommandRequest::AppByName {
            app_name: name.to_string(),
        })
        .await
    }

    pub async fn list_applications(&self) -> AppsResponse {
        match self.session.list_applications().await {
            Ok(apps) => AppsResponse { apps, message: None },
            Err(e) => AppsResponse {
                apps: Vec::new(),
                message: Some(e.to_string()),
            },
        }
    }

    pub async fn status(&self) -> StatusResponse {
        let remembered = self.session.store().remembered();
        StatusResponse::from_state(&self.session.status(), &remembered)
    }

    pub async fn disconnect(&self) -> CommandResponse {
        self.session.disconnect().await;
        info!("disconnect requested by UI");
        CommandResponse::ok("Disconnected")
    }

    /// Receiver for pushing state changes to the page.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.store().subscribe()
    }
}

fn connect_response(result: Result<DeviceIdentity, impl std::fmt::Display>) -> ConnectResponse {
    match result {
        Ok(identity) => ConnectResponse {
            success: true,
            message: format!("Connected to {}", identity.display_name()),
            identity: Some(DeviceDto::from(&identity)),
        },
        Err(e) => ConnectResponse {
            success: false,
            message: format!("Connection failed: {e}"),
            identity: None,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
