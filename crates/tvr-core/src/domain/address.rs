//! The address range swept by a subnet scan.
//!
//! Every scan covers exactly one `/24` network: the 254 host addresses
//! `a.b.c.1` through `a.b.c.254`.  The network is derived from the local
//! interface address by zeroing the last octet.
//!
//! # Known limitation
//!
//! The `/24` mask is assumed, never discovered.  On a `/16` or `/23` home
//! network the scan only sees the local interface's `/24` slice.  Netmask
//! discovery is intentionally out of scope.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// First host octet of a `/24` (the `.0` network address is skipped).
pub const FIRST_HOST: u8 = 1;
/// Last host octet of a `/24` (the `.255` broadcast address is skipped).
pub const LAST_HOST: u8 = 254;

/// A scan range that could not be understood.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range must be in CIDR notation (e.g. 192.168.1.0/24), got '{0}'")]
    NotCidr(String),
    #[error("invalid IPv4 network address '{0}'")]
    InvalidAddress(String),
    #[error("only /24 networks are supported, got /{0}")]
    UnsupportedPrefix(String),
}

/// A `/24` IPv4 network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    network: Ipv4Addr,
}

impl AddressRange {
    /// The only prefix length TV-Remote scans.
    pub const PREFIX_LEN: u8 = 24;

    /// Returns the `/24` that contains `addr`.
    pub fn containing(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self {
            network: Ipv4Addr::new(a, b, c, 0),
        }
    }

    /// The network address (`a.b.c.0`).
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns `true` when `addr` lies inside this `/24`.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        addr.octets()[..3] == self.network.octets()[..3]
    }

    /// Returns `true` when `addr` is one of the scannable host addresses.
    pub fn is_host(&self, addr: Ipv4Addr) -> bool {
        let last = addr.octets()[3];
        self.contains(addr) && (FIRST_HOST..=LAST_HOST).contains(&last)
    }

    /// Number of host addresses a scan of this range probes.
    pub fn host_count(&self) -> usize {
        usize::from(LAST_HOST - FIRST_HOST) + 1
    }

    /// Host addresses in ascending order, `.1` to `.254`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let [a, b, c, _] = self.network.octets();
        (FIRST_HOST..=LAST_HOST).map(move |host| Ipv4Addr::new(a, b, c, host))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, Self::PREFIX_LEN)
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    /// Parses `a.b.c.d/24`.  Host bits are ignored, so `10.0.0.7/24` and
    /// `10.0.0.0/24` name the same range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| RangeError::NotCidr(s.to_string()))?;

        let addr = Ipv4Addr::from_str(addr)
            .map_err(|_| RangeError::InvalidAddress(addr.to_string()))?;

        match prefix.parse::<u8>() {
            Ok(len) if len == Self::PREFIX_LEN => Ok(Self::containing(addr)),
            _ => Err(RangeError::UnsupportedPrefix(prefix.to_string())),
        }
    }
}

/// Derives the scan range for the local interface address `local`.
pub fn subnet_for(local: Ipv4Addr) -> AddressRange {
    AddressRange::containing(local)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
