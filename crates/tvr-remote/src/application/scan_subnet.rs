//! ScanSubnetUseCase: bounded, deadline-limited sweep of one `/24`.
//!
//! # How the sweep works
//!
//! ```text
//! hosts .1 … .254 ──► probe futures ──► buffer_unordered(concurrency) ──► results
//!                                                 ▲
//!                              overall deadline ──┘ (drops the whole stream)
//! ```
//!
//! At most `concurrency` probes are in flight at any moment.  Results are
//! collected in the order probes *finish*, so a fast device at `.200` is listed
//! before a slow one at `.3`.
//!
//! When the overall deadline fires the stream is dropped.  Dropping the stream
//! drops every in-flight probe future, and with it the probe's socket, so no
//! work outlives the scan.  Whatever was found up to that point is returned
//! with `timed_out = true`.
//!
//! Per-probe failures never surface as errors: a host that refuses, times out
//! or answers with garbage is simply "not found".

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tvr_core::{AddressRange, DeviceIdentity, RangeError, ScanResult};

/// Default number of probes in flight.
pub const DEFAULT_CONCURRENCY: usize = 50;
/// Default bound on a single host's TCP connect.
pub const DEFAULT_PER_HOST_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default bound on a whole scan.
pub const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_millis(5000);

/// Checks a single address for a control-capable device.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Returns the device's identity, or `None` when nothing usable answers.
    ///
    /// Implementations must return within roughly `timeout` plus their own
    /// handshake bound, and must be safe to drop mid-flight.
    async fn probe(&self, address: Ipv4Addr, timeout: Duration) -> Option<DeviceIdentity>;
}

/// Tuning knobs for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub per_host_timeout: Duration,
    pub overall_deadline: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            per_host_timeout: DEFAULT_PER_HOST_TIMEOUT,
            overall_deadline: DEFAULT_OVERALL_DEADLINE,
        }
    }
}

impl ScanOptions {
    /// Concurrency actually used: a configured `0` still probes one host at a
    /// time instead of stalling.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Sweeps address ranges with an injected [`HostProbe`].
pub struct SubnetScanner {
    probe: Arc<dyn HostProbe>,
}

impl SubnetScanner {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }

    /// Probes every host of `range` and returns the devices found before the
    /// deadline.
    pub async fn scan(&self, range: AddressRange, options: &ScanOptions) -> ScanResult {
        let started = Instant::now();
        let concurrency = options.effective_concurrency();
        let per_host = options.per_host_timeout;
        let probe = self.probe.as_ref();

        info!(
            "scanning {range} ({} hosts, concurrency {concurrency}, deadline {:?})",
            range.host_count(),
            options.overall_deadline
        );

        let mut results = stream::iter(range.hosts())
            .map(move |address| async move { probe.probe(address, per_host).await })
            .buffer_unordered(concurrency);

        let deadline = tokio::time::sleep(options.overall_deadline);
        tokio::pin!(deadline);

        let mut found = Vec::new();
        let mut timed_out = false;
        loop {
            tokio::select! {
                next = results.next() => match next {
                    Some(Some(identity)) => {
                        debug!("found {} at {}", identity.display_name(), identity.address());
                        found.push(identity);
                    }
                    Some(None) => {}
                    None => break,
                },
                _ = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }
        // Drops every probe still in flight.
        drop(results);

        let elapsed = started.elapsed();
        if timed_out {
            warn!(
                "scan of {range} hit its {:?} deadline; returning {} device(s) found so far",
                options.overall_deadline,
                found.len()
            );
        } else {
            info!("scan of {range} finished in {elapsed:?}: {} device(s)", found.len());
        }
        ScanResult::new(found, timed_out, elapsed)
    }

    /// Parses `cidr` (e.g. `"10.0.0.0/24"`) and scans it.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when `cidr` is not a `/24` in CIDR notation.
    pub async fn scan_cidr(&self, cidr: &str, options: &ScanOptions) -> Result<ScanResult, RangeError> {
        let range: AddressRange = cidr.parse()?;
        Ok(self.scan(range, options).await)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
