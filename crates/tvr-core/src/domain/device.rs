//! Device identity and scan results.

use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

/// A control-capable device found by a probe.
///
/// Immutable once constructed.  Two identities are equal when they refer to
/// the same address, regardless of name or probe time, so a device that was
/// renamed between two scans is still "the same" device.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    address: Ipv4Addr,
    display_name: String,
    probed_at: SystemTime,
}

impl DeviceIdentity {
    /// Creates an identity stamped with the current time.
    pub fn new(address: Ipv4Addr, display_name: impl Into<String>) -> Self {
        Self::with_probe_time(address, display_name, SystemTime::now())
    }

    /// Creates an identity with an explicit probe timestamp.
    pub fn with_probe_time(
        address: Ipv4Addr,
        display_name: impl Into<String>,
        probed_at: SystemTime,
    ) -> Self {
        Self {
            address,
            display_name: display_name.into(),
            probed_at,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn probed_at(&self) -> SystemTime {
        self.probed_at
    }
}

impl PartialEq for DeviceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for DeviceIdentity {}

impl Hash for DeviceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// The devices found by one scan pass.
///
/// `devices` is in probe *completion* order, not address order: the device
/// that answered first is listed first.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    devices: Vec<DeviceIdentity>,
    timed_out: bool,
    elapsed: Duration,
}

impl ScanResult {
    pub fn new(devices: Vec<DeviceIdentity>, timed_out: bool, elapsed: Duration) -> Self {
        Self {
            devices,
            timed_out,
            elapsed,
        }
    }

    pub fn devices(&self) -> &[DeviceIdentity] {
        &self.devices
    }

    /// `true` when the overall deadline elapsed before every probe finished.
    /// The devices found up to that point are still reported.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Looks up a found device by address.
    pub fn find(&self, address: Ipv4Addr) -> Option<&DeviceIdentity> {
        self.devices.iter().find(|d| d.address == address)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
