//! TOML-based settings and last-device persistence.
//!
//! Files live in the platform-appropriate config directory:
//! - Windows:  `%APPDATA%\TvRemote\`
//! - Linux:    `~/.config/tv-remote/` (or `$XDG_CONFIG_HOME/tv-remote/`)
//! - macOS:    `~/Library/Application Support/TvRemote/`
//!
//! # `settings.toml`
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [scan]
//! concurrency = 50
//! per_host_timeout_ms = 1000
//! handshake_timeout_ms = 2000
//! overall_deadline_ms = 5000
//!
//! [device]
//! control_port = 8001
//! connect_timeout_ms = 7000
//! command_timeout_ms = 3000
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]`, so a missing file, a
//! missing section, or a missing key all fall back to the values above.  This
//! keeps first run working and lets older files load after new keys are
//! added.
//!
//! # `device.toml`
//!
//! The [`PersistedConfig`] written after each successful connect:
//!
//! ```toml
//! address = "10.0.0.5"
//! display_name = "LivingRoomTV"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tvr_core::PersistedConfig;

use crate::application::device_session::SessionTimeouts;
use crate::application::scan_subnet::ScanOptions;
use crate::application::session_store::{ConfigRepository, StorageError};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const DEVICE_FILE: &str = "device.toml";
pub const TOKENS_FILE: &str = "tokens.toml";

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level `settings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub device: DeviceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralSettings {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Subnet scan tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanSettings {
    /// Probes in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Bound on each host's TCP connect.
    #[serde(default = "default_per_host_timeout_ms")]
    pub per_host_timeout_ms: u64,
    /// Bound on the identity handshake after a successful TCP connect.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Bound on the whole scan.
    #[serde(default = "default_overall_deadline_ms")]
    pub overall_deadline_ms: u64,
}

/// Device session tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSettings {
    /// TCP port of the display's remote-control service.
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// Bound on opening a session (includes accepting a pairing prompt).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Bound on each command.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_concurrency() -> usize {
    50
}
fn default_per_host_timeout_ms() -> u64 {
    1000
}
fn default_handshake_timeout_ms() -> u64 {
    2000
}
fn default_overall_deadline_ms() -> u64 {
    5000
}
fn default_control_port() -> u16 {
    8001
}
fn default_connect_timeout_ms() -> u64 {
    7000
}
fn default_command_timeout_ms() -> u64 {
    3000
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            per_host_timeout_ms: default_per_host_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            overall_deadline_ms: default_overall_deadline_ms(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            control_port: default_control_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl ScanSettings {
    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            concurrency: self.concurrency,
            per_host_timeout: Duration::from_millis(self.per_host_timeout_ms),
            overall_deadline: Duration::from_millis(self.overall_deadline_ms),
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl DeviceSettings {
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            command: Duration::from_millis(self.command_timeout_ms),
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// The directory holding all TV-Remote files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    /// Uses an explicit directory (CLI `--config-dir`, tests).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformDir`] when the base directory cannot
    /// be determined from the environment.
    pub fn platform() -> Result<Self, StorageError> {
        platform_config_dir()
            .map(Self::new)
            .ok_or(StorageError::NoPlatformDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn device_file(&self) -> PathBuf {
        self.dir.join(DEVICE_FILE)
    }

    pub fn tokens_file(&self) -> PathBuf {
        self.dir.join(TOKENS_FILE)
    }
}

/// Resolves the platform config directory including the `TvRemote` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TvRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tv-remote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TvRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── TOML file helpers ─────────────────────────────────────────────────────────

/// Reads `path` as TOML, returning `None` if the file does not exist.
pub(crate) fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `value` to `path` as TOML, creating the parent directory.
pub(crate) fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(value).map_err(|e| StorageError::Serialize(e.to_string()))?;
    std::fs::write(path, content).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Loads `settings.toml`, returning defaults if it does not exist.
///
/// # Errors
///
/// Returns [`StorageError::Io`] for file-system errors other than "not
/// found", and [`StorageError::Parse`] if the TOML is malformed.
pub fn load_settings(paths: &ConfigPaths) -> Result<Settings, StorageError> {
    Ok(read_toml(&paths.settings_file())?.unwrap_or_default())
}

/// Writes `settings.toml`.
pub fn save_settings(paths: &ConfigPaths, settings: &Settings) -> Result<(), StorageError> {
    write_toml(&paths.settings_file(), settings)
}

// ── Last-device repository ────────────────────────────────────────────────────

/// [`ConfigRepository`] backed by `device.toml`.
#[derive(Debug, Clone)]
pub struct FileConfigRepository {
    path: PathBuf,
}

impl FileConfigRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(paths: &ConfigPaths) -> Self {
        Self::new(paths.device_file())
    }
}

impl ConfigRepository for FileConfigRepository {
    fn load(&self) -> Result<PersistedConfig, StorageError> {
        Ok(read_toml(&self.path)?.unwrap_or_default())
    }

    fn save(&self, config: &PersistedConfig) -> Result<(), StorageError> {
        write_toml(&self.path, config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
