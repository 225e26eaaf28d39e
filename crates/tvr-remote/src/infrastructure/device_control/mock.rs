//! In-process fake display network for testing.
//!
//! Allows tests to stand up any number of "displays" at chosen addresses, each
//! with a name, a token store, an app list, and scripted failures, without
//! real hardware or sockets.
//!
//! Token behaviour mirrors real displays: a token-less open pairs (unless the
//! device is told to refuse) and issues `token-N`; a presented token must be
//! one the device issued or was told to accept, otherwise the open fails with
//! [`ProtocolError::TokenRejected`].

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tvr_core::{
    AppDescriptor, AppId, AuthToken, ControlProtocol, DeviceIdentity, DeviceInfo, KeyCode,
    ProtocolError, SessionHandle,
};
use uuid::Uuid;

use crate::application::scan_subnet::HostProbe;

/// One recorded protocol call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Open { address: Ipv4Addr, token: Option<String> },
    Identify { address: Ipv4Addr },
    Info { address: Ipv4Addr },
    SendKey { address: Ipv4Addr, key: String },
    ListApps { address: Ipv4Addr },
    Launch { address: Ipv4Addr, app: String },
    Close { address: Ipv4Addr },
}

#[derive(Debug, Default)]
struct FakeDevice {
    name: String,
    tokens: HashSet<String>,
    refuse_pairing: bool,
    installed: Vec<AppDescriptor>,
    launchable: HashSet<String>,
    keys: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    devices: HashMap<Ipv4Addr, FakeDevice>,
    open_sessions: HashSet<Uuid>,
    calls: Vec<FakeCall>,
    issued: u32,
    fail_next: Option<ProtocolError>,
    open_latency: Duration,
    command_latency: Duration,
    silent_hosts: bool,
}

/// A fake network of displays.
#[derive(Debug, Default)]
pub struct FakeDeviceNetwork {
    state: Mutex<FakeState>,
}

impl FakeDeviceNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("lock poisoned");
        f(&mut state)
    }

    fn with_device(&self, address: Ipv4Addr, f: impl FnOnce(&mut FakeDevice)) {
        self.with_state(|s| {
            let device = s
                .devices
                .get_mut(&address)
                .unwrap_or_else(|| panic!("no fake device at {address}; call add_device first"));
            f(device);
        });
    }

    // ── Scripting ─────────────────────────────────────────────────────────────

    /// Places a display named `name` at `address`.
    pub fn add_device(&self, address: Ipv4Addr, name: &str) {
        self.with_state(|s| {
            s.devices.insert(
                address,
                FakeDevice {
                    name: name.to_string(),
                    ..FakeDevice::default()
                },
            );
        });
    }

    /// Unplugs the display.  Open sessions with it fail with a transport error.
    pub fn remove_device(&self, address: Ipv4Addr) {
        self.with_state(|s| {
            s.devices.remove(&address);
        });
    }

    /// Makes the user decline every pairing prompt on this display.
    pub fn refuse_pairing(&self, address: Ipv4Addr) {
        self.with_device(address, |d| d.refuse_pairing = true);
    }

    /// Makes the display accept `token` as if it had issued it.
    pub fn accept_token(&self, address: Ipv4Addr, token: &str) {
        self.with_device(address, |d| {
            d.tokens.insert(token.to_string());
        });
    }

    /// Forgets every token the display issued.
    pub fn revoke_tokens(&self, address: Ipv4Addr) {
        self.with_device(address, |d| d.tokens.clear());
    }

    /// Adds an installed (and launchable) app.
    pub fn install_app(&self, address: Ipv4Addr, id: &str, name: &str) {
        self.with_device(address, |d| {
            if let Ok(app_id) = AppId::parse(id) {
                d.installed.push(AppDescriptor::new(app_id, name));
            }
            d.launchable.insert(id.to_string());
        });
    }

    /// Makes an app id launchable without listing it as installed.
    pub fn accept_launch(&self, address: Ipv4Addr, id: &str) {
        self.with_device(address, |d| {
            d.launchable.insert(id.to_string());
        });
    }

    /// The next protocol call (other than `close_session`) fails with `err`.
    pub fn fail_next_call(&self, err: ProtocolError) {
        self.with_state(|s| s.fail_next = Some(err));
    }

    /// Delay applied to `open_session` and `identify`.
    pub fn set_open_latency(&self, latency: Duration) {
        self.with_state(|s| s.open_latency = latency);
    }

    /// Delay applied to every call on an open session.
    pub fn set_command_latency(&self, latency: Duration) {
        self.with_state(|s| s.command_latency = latency);
    }

    /// When `true`, probes of empty addresses hang until their timeout (like a
    /// firewalled host) instead of being refused at once.
    pub fn set_silent_hosts(&self, silent: bool) {
        self.with_state(|s| s.silent_hosts = silent);
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Keys the display at `address` received.
    pub fn keys_received(&self, address: Ipv4Addr) -> Vec<String> {
        self.with_state(|s| {
            s.devices
                .get(&address)
                .map(|d| d.keys.clone())
                .unwrap_or_default()
        })
    }

    /// Number of sessions currently open across all displays.
    pub fn open_session_count(&self) -> usize {
        self.with_state(|s| s.open_sessions.len())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Records `call` and returns the latency to apply and any scripted failure.
    fn begin(&self, call: FakeCall, opening: bool) -> (Duration, Option<ProtocolError>) {
        self.with_state(|s| {
            s.calls.push(call);
            let latency = if opening { s.open_latency } else { s.command_latency };
            (latency, s.fail_next.take())
        })
    }

    async fn enter(&self, call: FakeCall, opening: bool) -> Result<(), ProtocolError> {
        let (latency, failure) = self.begin(call, opening);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        failure.map_or(Ok(()), Err)
    }

    /// Runs `f` against the device behind an open session.
    fn on_session<R>(
        &self,
        handle: &SessionHandle,
        f: impl FnOnce(&mut FakeDevice) -> Result<R, ProtocolError>,
    ) -> Result<R, ProtocolError> {
        self.with_state(|s| {
            if !s.open_sessions.contains(&handle.id()) {
                return Err(ProtocolError::Transport("session is closed".to_string()));
            }
            match s.devices.get_mut(&handle.address()) {
                Some(device) => f(device),
                None => Err(ProtocolError::Transport("connection reset by peer".to_string())),
            }
        })
    }
}

#[async_trait]
impl ControlProtocol for FakeDeviceNetwork {
    async fn open_session(
        &self,
        address: Ipv4Addr,
        token: Option<&AuthToken>,
    ) -> Result<SessionHandle, ProtocolError> {
        let presented = token.map(|t| t.as_str().to_string());
        self.enter(
            FakeCall::Open {
                address,
                token: presented.clone(),
            },
            true,
        )
        .await?;

        self.with_state(|s| {
            let device = s
                .devices
                .get_mut(&address)
                .ok_or_else(|| ProtocolError::Transport("connection refused".to_string()))?;

            let issued = match presented {
                Some(t) if device.tokens.contains(&t) => None,
                Some(_) => return Err(ProtocolError::TokenRejected),
                None if device.refuse_pairing => {
                    return Err(ProtocolError::AuthRejected("pairing prompt declined".to_string()))
                }
                None => {
                    s.issued += 1;
                    let fresh = format!("token-{}", s.issued);
                    device.tokens.insert(fresh.clone());
                    Some(AuthToken::new(fresh))
                }
            };

            let handle = SessionHandle::new(address, issued);
            s.open_sessions.insert(handle.id());
            Ok(handle)
        })
    }

    async fn device_info(&self, handle: &SessionHandle) -> Result<DeviceInfo, ProtocolError> {
        self.enter(FakeCall::Info { address: handle.address() }, false)
            .await?;
        self.on_session(handle, |d| Ok(DeviceInfo::new(d.name.clone())))
    }

    async fn send_key(&self, handle: &SessionHandle, key: &KeyCode) -> Result<(), ProtocolError> {
        self.enter(
            FakeCall::SendKey {
                address: handle.address(),
                key: key.to_string(),
            },
            false,
        )
        .await?;
        self.on_session(handle, |d| {
            d.keys.push(key.to_string());
            Ok(())
        })
    }

    async fn list_apps(&self, handle: &SessionHandle) -> Result<Vec<AppDescriptor>, ProtocolError> {
        self.enter(FakeCall::ListApps { address: handle.address() }, false)
            .await?;
        self.on_session(handle, |d| Ok(d.installed.clone()))
    }

    async fn launch_app(&self, handle: &SessionHandle, app: &AppId) -> Result<(), ProtocolError> {
        self.enter(
            FakeCall::Launch {
                address: handle.address(),
                app: app.to_string(),
            },
            false,
        )
        .await?;
        self.on_session(handle, |d| {
            if d.launchable.contains(app.as_str()) {
                Ok(())
            } else {
                Err(ProtocolError::Rejected(format!("unknown app {app}")))
            }
        })
    }

    async fn close_session(&self, handle: &SessionHandle) -> Result<(), ProtocolError> {
        self.with_state(|s| {
            s.calls.push(FakeCall::Close {
                address: handle.address(),
            });
            s.open_sessions.remove(&handle.id());
        });
        Ok(())
    }

    /// Answers without pairing, like a display's unauthenticated info endpoint.
    async fn identify(&self, address: Ipv4Addr) -> Result<DeviceInfo, ProtocolError> {
        self.enter(FakeCall::Identify { address }, true).await?;
        self.with_state(|s| {
            s.devices
                .get(&address)
                .map(|d| DeviceInfo::new(d.name.clone()))
                .ok_or_else(|| ProtocolError::Transport("connection refused".to_string()))
        })
    }
}

/// Probes the fake network directly, skipping the TCP stage.
#[async_trait]
impl HostProbe for FakeDeviceNetwork {
    async fn probe(&self, address: Ipv4Addr, timeout: Duration) -> Option<DeviceIdentity> {
        let (present, silent) =
            self.with_state(|s| (s.devices.contains_key(&address), s.silent_hosts));
        if !present {
            if silent {
                tokio::time::sleep(timeout).await;
            }
            return None;
        }
        match tokio::time::timeout(timeout, self.identify(address)).await {
            Ok(Ok(info)) if info.has_name() => {
                Some(DeviceIdentity::new(address, info.display_name.trim()))
            }
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
