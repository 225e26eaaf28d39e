//! DeviceProbe: is there a controllable display at this address?
//!
//! A probe runs in two stages:
//!
//! 1. **TCP connect** to the control port, bounded by the per-host timeout.
//!    Most addresses on a home network are empty or belong to phones and
//!    printers; they refuse or time out here, which is cheap.
//! 2. **Identity handshake** through [`ControlProtocol::identify`], bounded
//!    by the handshake timeout.  Something listening on the port is not
//!    necessarily a display; only a non-empty name counts as a match.
//!
//! The TCP stream from stage 1 is dropped before stage 2 starts.  Stage 2
//! runs on its own task: the probe stops waiting at the handshake timeout,
//! but `identify` still runs to completion and closes whatever session it
//! opened, even when the scan that started it has been dropped.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use tvr_core::{ControlProtocol, DeviceIdentity};

use crate::application::scan_subnet::HostProbe;

/// Default control port of the display's remote service.
pub const DEFAULT_CONTROL_PORT: u16 = 8001;
/// Default bound on the identity handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(2000);

/// What a single probe saw.  Scans only care about `Found`; the other
/// variants exist for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(DeviceIdentity),
    /// Nothing accepted a TCP connection on the control port.
    Closed,
    /// Something is listening but it did not identify as a display.
    Incompatible(String),
}

impl ProbeOutcome {
    pub fn into_identity(self) -> Option<DeviceIdentity> {
        match self {
            Self::Found(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Production [`HostProbe`].
pub struct DeviceProbe {
    protocol: Arc<dyn ControlProtocol>,
    control_port: u16,
    handshake_timeout: Duration,
}

impl DeviceProbe {
    pub fn new(protocol: Arc<dyn ControlProtocol>, control_port: u16, handshake_timeout: Duration) -> Self {
        Self {
            protocol,
            control_port,
            handshake_timeout,
        }
    }

    /// Probes `address`, reporting why a host did not match.
    pub async fn probe_detailed(&self, address: Ipv4Addr, connect_timeout: Duration) -> ProbeOutcome {
        let target = SocketAddr::from((address, self.control_port));
        match timeout(connect_timeout, TcpStream::connect(target)).await {
            Ok(Ok(stream)) => drop(stream),
            Ok(Err(e)) => {
                debug!("{target}: {e}");
                return ProbeOutcome::Closed;
            }
            Err(_) => return ProbeOutcome::Closed,
        }

        let protocol = Arc::clone(&self.protocol);
        let handshake = tokio::spawn(async move { protocol.identify(address).await });

        match timeout(self.handshake_timeout, handshake).await {
            Ok(Ok(Ok(info))) if info.has_name() => {
                ProbeOutcome::Found(DeviceIdentity::new(address, info.display_name.trim()))
            }
            Ok(Ok(Ok(_))) => ProbeOutcome::Incompatible("empty display name".to_string()),
            Ok(Ok(Err(e))) => ProbeOutcome::Incompatible(e.to_string()),
            Ok(Err(e)) => ProbeOutcome::Incompatible(format!("handshake task failed: {e}")),
            Err(_) => ProbeOutcome::Incompatible(format!(
                "no identity within {:?}",
                self.handshake_timeout
            )),
        }
    }
}

#[async_trait]
impl HostProbe for DeviceProbe {
    async fn probe(&self, address: Ipv4Addr, timeout: Duration) -> Option<DeviceIdentity> {
        let outcome = self.probe_detailed(address, timeout).await;
        if let ProbeOutcome::Incompatible(reason) = &outcome {
            debug!("{address} is listening but is not a display: {reason}");
        }
        outcome.into_identity()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
