//! Auth token storage in `tokens.toml`.
//!
//! ```toml
//! [tokens]
//! "10.0.0.5" = "12345678"
//! ```
//!
//! Tokens grant control of a display without a pairing prompt, so the file
//! should be treated like a credential store.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tvr_core::AuthToken;

use super::config::{read_toml, write_toml, ConfigPaths};
use crate::application::session_store::{StorageError, TokenRepository};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: BTreeMap<String, AuthToken>,
}

/// [`TokenRepository`] backed by `tokens.toml`.
///
/// The file is re-read on every call.  Writes are read-modify-write, so they
/// are serialised within the process.
#[derive(Debug)]
pub struct FileTokenRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(paths: &ConfigPaths) -> Self {
        Self::new(paths.tokens_file())
    }

    fn read(&self) -> Result<TokenFile, StorageError> {
        Ok(read_toml(&self.path)?.unwrap_or_default())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, AuthToken>) -> bool) -> Result<(), StorageError> {
        // A poisoned lock only means another writer panicked; the file is
        // still consistent because each write replaces it whole.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read()?;
        if f(&mut file.tokens) {
            write_toml(&self.path, &file)?;
        }
        Ok(())
    }
}

impl TokenRepository for FileTokenRepository {
    fn load(&self, address: Ipv4Addr) -> Result<Option<AuthToken>, StorageError> {
        Ok(self.read()?.tokens.remove(&address.to_string()))
    }

    fn save(&self, address: Ipv4Addr, token: &AuthToken) -> Result<(), StorageError> {
        self.update(|tokens| {
            tokens.insert(address.to_string(), token.clone());
            true
        })
    }

    fn discard(&self, address: Ipv4Addr) -> Result<(), StorageError> {
        self.update(|tokens| tokens.remove(&address.to_string()).is_some())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
