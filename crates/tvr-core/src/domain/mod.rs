//! Domain layer: pure value types with no I/O.
//!
//! # Sub-modules
//!
//! - **`address`** – The `/24` [`address::AddressRange`] a scan sweeps, and the
//!   helper that derives it from the local interface address.
//!
//! - **`device`** – [`device::DeviceIdentity`] (what a successful probe
//!   returns) and [`device::ScanResult`] (what a scan returns).
//!
//! - **`session`** – The session state machine values, the last-device record
//!   persisted between runs, and the device-issued auth token.
//!
//! - **`command`** / **`apps`** – What a user can ask the display to do: press
//!   a key or launch an application.

pub mod address;
pub mod apps;
pub mod command;
pub mod device;
pub mod session;
