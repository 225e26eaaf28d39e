//! Application layer use cases for TV-Remote.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure value types in `tvr-core`) and the infrastructure (sockets, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "find the
//!   displays on my network", "turn the volume up").
//! - **Depend on abstractions** (traits) rather than concrete implementations:
//!   probes, persistence, and the device protocol are all injected.
//! - **Contain no OS calls and no file system access**.  Timers are the only
//!   runtime facility used here, because every network operation must be
//!   bounded.
//!
//! # Sub-modules
//!
//! - **`scan_subnet`** – Fans a [`scan_subnet::HostProbe`] out over the 254
//!   hosts of a `/24` with bounded concurrency and an overall deadline.
//!
//! - **`session_store`** – Holds the single session state, the active session
//!   handle, and the remembered device.  The only code that talks to the
//!   config and token repositories.
//!
//! - **`device_session`** – The connect / command / disconnect state machine
//!   built on top of the store and the `ControlProtocol` capability.

pub mod device_session;
pub mod scan_subnet;
pub mod session_store;
