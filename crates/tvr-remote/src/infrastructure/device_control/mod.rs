//! Device control adapters.
//!
//! The vendor remote-control protocol itself is supplied by whoever embeds
//! TV-Remote, as an implementation of [`tvr_core::ControlProtocol`].  This
//! module holds what the crate ships on its own side of that seam:
//!
//! - **`mock`** – [`mock::FakeDeviceNetwork`], an in-process network of fake
//!   displays implementing both `ControlProtocol` and `HostProbe`.  Tests and
//!   demos use it to exercise discovery and sessions without hardware.

pub mod mock;
