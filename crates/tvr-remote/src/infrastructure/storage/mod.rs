//! Storage infrastructure: TOML files in the platform config directory.
//!
//! - `settings.toml` – tuning (scan concurrency, timeouts, control port, log
//!   level).  Read once at startup.
//! - `device.toml`   – the last connected device ([`config::FileConfigRepository`]).
//! - `tokens.toml`   – auth tokens per device address ([`tokens::FileTokenRepository`]).
//!
//! Every file is opened and closed per call; nothing is cached here.  Missing
//! files read as defaults so first run needs no setup.

pub mod config;
pub mod tokens;
