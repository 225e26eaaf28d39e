//! # tvr-core
//!
//! Shared library for TV-Remote containing the domain entities, the command
//! vocabulary, and the capability interface through which the rest of the
//! system talks to a smart display.
//!
//! This crate has zero dependencies on OS APIs, sockets, or the file system.
//! Everything that touches the network or the disk lives in `tvr-remote`.
//!
//! # Architecture overview
//!
//! TV-Remote finds a smart display on the local network and drives it like a
//! remote control: it scans the local `/24` for candidate devices, opens an
//! authenticated session with the one the user picks, and forwards key presses
//! and app launches over that session.
//!
//! This crate is the shared foundation.  It defines:
//!
//! - **`domain`** – Addresses and the scanned [`AddressRange`], the immutable
//!   [`DeviceIdentity`] produced by a probe, the [`SessionState`] machine
//!   values, the [`PersistedConfig`] remembered between runs, and the opaque
//!   [`AuthToken`].  Also the remote-control command vocabulary
//!   ([`KeyCode`], [`CommandKind`]) and the app catalogue.
//!
//! - **`protocol`** – The [`ControlProtocol`] trait.  The vendor wire protocol
//!   is opaque here: whoever embeds TV-Remote supplies an adapter that
//!   implements this trait, and the session and probe logic only ever speak to
//!   the trait.

pub mod domain;
pub mod protocol;

pub use domain::address::{subnet_for, AddressRange, RangeError};
pub use domain::apps::{resolve_app_candidates, well_known_app_ids, AppDescriptor, AppId};
pub use domain::command::{CommandKind, InvalidCommand, KeyCode};
pub use domain::device::{DeviceIdentity, ScanResult};
pub use domain::session::{AuthToken, PersistedConfig, SessionState};
pub use protocol::{ControlProtocol, DeviceInfo, ProtocolError, SessionHandle};
