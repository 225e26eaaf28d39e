//! Remote-control commands.
//!
//! A command is either a key press (`KEY_VOLUP`, `KEY_HOME`, ...) or an app
//! launch.  Key codes follow the `KEY_*` naming used by the displays' remote
//! channel; the adapter passes them through untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::apps::AppId;

/// Keys present on the standard remote layout.
pub const STANDARD_KEYS: &[&str] = &[
    "KEY_POWER",
    "KEY_VOLUP",
    "KEY_VOLDOWN",
    "KEY_MUTE",
    "KEY_CHUP",
    "KEY_CHDOWN",
    "KEY_UP",
    "KEY_DOWN",
    "KEY_LEFT",
    "KEY_RIGHT",
    "KEY_ENTER",
    "KEY_RETURN",
    "KEY_HOME",
    "KEY_MENU",
    "KEY_SOURCE",
    "KEY_GUIDE",
    "KEY_INFO",
    "KEY_0",
    "KEY_1",
    "KEY_2",
    "KEY_3",
    "KEY_4",
    "KEY_5",
    "KEY_6",
    "KEY_7",
    "KEY_8",
    "KEY_9",
];

/// A command that could not be built from user input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidCommand {
    #[error("key code required")]
    EmptyKey,
    #[error("key code '{0}' must look like KEY_NAME")]
    MalformedKey(String),
    #[error("app id required")]
    EmptyAppId,
}

/// A remote key code such as `KEY_VOLUP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCode(String);

impl KeyCode {
    /// Validates and wraps a key code.
    ///
    /// Codes must start with `KEY_` followed by uppercase ASCII letters, digits
    /// or underscores.  Non-standard codes are accepted: newer displays know
    /// keys this crate has never heard of.
    pub fn parse(raw: &str) -> Result<Self, InvalidCommand> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidCommand::EmptyKey);
        }
        let well_formed = raw
            .strip_prefix("KEY_")
            .map(|rest| {
                !rest.is_empty()
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            })
            .unwrap_or(false);
        if !well_formed {
            return Err(InvalidCommand::MalformedKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for keys on the standard remote layout.
    pub fn is_standard(&self) -> bool {
        STANDARD_KEYS.contains(&self.0.as_str())
    }
}

impl TryFrom<String> for KeyCode {
    type Error = InvalidCommand;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyCode> for String {
    fn from(key: KeyCode) -> Self {
        key.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the user asked the display to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Key(KeyCode),
    LaunchApp(AppId),
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key {key}"),
            Self::LaunchApp(app) => write!(f, "launch {app}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
