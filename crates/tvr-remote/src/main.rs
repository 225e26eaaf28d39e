//! TV-Remote operator CLI.
//!
//! The discovery and session core is a library embedded by the HTTP/UI host.
//! This binary is the operator's side door into the same files: it reports
//! the local subnet the scanner would sweep, shows the remembered device, and
//! manages stored settings and auth tokens.
//!
//! # Usage
//!
//! ```text
//! tvr-remote [--config-dir <DIR>] <COMMAND>
//!
//! Commands:
//!   addr                   Print the local IPv4 address and scan range
//!   status                 Print the remembered device as JSON
//!   settings [--write]     Print effective settings (optionally write them)
//!   forget-token <ADDRESS> Delete the stored auth token for a display
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable         | Description                                   |
//! |------------------|-----------------------------------------------|
//! | `TVR_CONFIG_DIR` | Config directory (default: platform dir)      |
//! | `RUST_LOG`       | Log filter (default: `general.log_level`)     |

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tvr_core::SessionState;
use tvr_remote::application::session_store::{ConfigRepository, TokenRepository};
use tvr_remote::infrastructure::network::addressing::{local_address, local_subnet};
use tvr_remote::infrastructure::storage::config::{
    load_settings, save_settings, ConfigPaths, FileConfigRepository,
};
use tvr_remote::infrastructure::storage::tokens::FileTokenRepository;
use tvr_remote::infrastructure::ui_bridge::StatusResponse;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "tvr-remote",
    about = "Discovery and session tooling for TV-Remote",
    version
)]
struct Cli {
    /// Directory holding settings.toml, device.toml and tokens.toml.
    ///
    /// Defaults to the platform config directory.
    #[arg(long, env = "TVR_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the local IPv4 address and the /24 a scan would cover.
    Addr,
    /// Print the remembered device and whether a token is stored for it.
    Status,
    /// Print the effective settings as TOML.
    Settings {
        /// Also write them to settings.toml.
        #[arg(long)]
        write: bool,
    },
    /// Delete the stored auth token for a display.
    ForgetToken {
        address: Ipv4Addr,
    },
}

#[derive(Debug, Serialize)]
struct StatusReport {
    #[serde(flatten)]
    status: StatusResponse,
    token_stored: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.config_dir {
        Some(dir) => ConfigPaths::new(dir),
        None => ConfigPaths::platform().context("no config directory; pass --config-dir")?,
    };
    let settings = load_settings(&paths)
        .with_context(|| format!("failed to load settings from {}", paths.dir().display()))?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!("config directory: {}", paths.dir().display());

    match cli.command {
        Command::Addr => {
            let address = local_address().context("no route to determine the local address")?;
            println!("address: {address}");
            println!("scan range: {}", local_subnet());
        }
        Command::Status => {
            let remembered = FileConfigRepository::in_dir(&paths)
                .load()
                .context("failed to read the remembered device")?;
            let token_stored = match remembered.address {
                Some(address) => FileTokenRepository::in_dir(&paths)
                    .load(address)
                    .context("failed to read stored tokens")?
                    .is_some(),
                None => false,
            };
            let report = StatusReport {
                status: StatusResponse::from_state(&SessionState::default(), &remembered),
                token_stored,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Settings { write } => {
            print!("{}", toml::to_string_pretty(&settings)?);
            if write {
                save_settings(&paths, &settings).context("failed to write settings")?;
                info!("wrote {}", paths.settings_file().display());
            }
        }
        Command::ForgetToken { address } => {
            FileTokenRepository::in_dir(&paths)
                .discard(address)
                .with_context(|| format!("failed to discard token for {address}"))?;
            info!("token for {address} discarded");
        }
    }

    Ok(())
}
