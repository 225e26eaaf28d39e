//! Capability interface to the display's remote-control service, and the
//! session handle it issues.

pub mod capability;
pub mod handle;

pub use capability::{ControlProtocol, ProtocolError};
pub use handle::{DeviceInfo, SessionHandle};
