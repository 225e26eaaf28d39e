//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`addressing`** – Finds the local IPv4 address by asking the OS which
//!   interface it would route through, and derives the `/24` to scan.
//!
//! - **`probe`** – [`probe::DeviceProbe`]: a TCP connect to the control port
//!   followed by an identity handshake through the `ControlProtocol`.  This is
//!   the [`crate::application::scan_subnet::HostProbe`] used in production.

pub mod addressing;
pub mod probe;
