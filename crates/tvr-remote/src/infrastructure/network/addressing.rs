//! Local address discovery.
//!
//! # How do we find "our" address? (for beginners)
//!
//! A machine may have several interfaces (Wi-Fi, Ethernet, Docker bridges,
//! VPN tunnels).  The one that matters is the interface the OS would use to
//! reach the outside world, because the display sits on that LAN.
//!
//! The trick: create a UDP socket and `connect` it to a public address.  For
//! UDP, `connect` sends nothing; it only asks the routing table to pick an
//! outbound interface and binds the socket to that interface's address.
//! Reading `local_addr()` back tells us the answer.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use thiserror::Error;
use tracing::{debug, warn};
use tvr_core::{subnet_for, AddressRange};

/// Address used only to select a route.  No packet is sent to it.
pub const ROUTE_PROBE_TARGET: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 80));

/// No usable outbound IPv4 route.
#[derive(Debug, Error)]
pub enum NoRouteError {
    #[error("could not open a UDP socket: {0}")]
    Socket(#[source] io::Error),

    #[error("no route to {target}: {source}")]
    Unroutable {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("outbound interface has no usable IPv4 address (got {0})")]
    NotIpv4(IpAddr),
}

/// Returns the IPv4 address of the interface that routes to the internet.
///
/// # Errors
///
/// Returns [`NoRouteError`] when the machine has no default route or the
/// selected interface has no IPv4 address.
pub fn local_address() -> Result<Ipv4Addr, NoRouteError> {
    local_address_via(ROUTE_PROBE_TARGET)
}

/// Like [`local_address`], but routes towards `target`.
pub fn local_address_via(target: SocketAddr) -> Result<Ipv4Addr, NoRouteError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(NoRouteError::Socket)?;
    socket
        .connect(target)
        .map_err(|source| NoRouteError::Unroutable { target, source })?;
    let local = socket.local_addr().map_err(NoRouteError::Socket)?;

    match local.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() => {
            debug!("local address {v4} (route towards {target})");
            Ok(v4)
        }
        other => Err(NoRouteError::NotIpv4(other)),
    }
}

/// [`local_address`], falling back to loopback when there is no route.
pub fn local_address_or_loopback() -> Ipv4Addr {
    local_address().unwrap_or_else(|e| {
        warn!("could not determine local address, falling back to loopback: {e}");
        Ipv4Addr::LOCALHOST
    })
}

/// The `/24` a default scan sweeps.
pub fn local_subnet() -> AddressRange {
    subnet_for(local_address_or_loopback())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
