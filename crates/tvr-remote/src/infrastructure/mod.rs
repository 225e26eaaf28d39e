//! Infrastructure layer for TV-Remote.
//!
//! Contains OS-facing adapters: local address discovery and TCP probes,
//! file-system storage, the service facade handed to the HTTP/UI layer, and an
//! in-process fake device network used by tests and demos.
//!
//! **Dependency rule**: this layer may depend on `application` and `tvr_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod device_control;
pub mod network;
pub mod storage;
pub mod ui_bridge;
