//! Applications installed on a display, and the fallback catalogue used when
//! the installed list does not contain what the user asked for.
//!
//! # Launch-by-name resolution
//!
//! A user types "netflix", not `3201907018807`.  [`resolve_app_candidates`]
//! turns that query into an ordered list of app ids to try:
//!
//! 1. installed apps whose name equals the query (case-insensitive),
//! 2. installed apps whose name contains the query,
//! 3. the well-known ids for that name from the built-in catalogue.
//!
//! Displays from different model years register the same app under
//! different ids, which is why the catalogue holds several ids per name.  The
//! caller launches each candidate in turn until one succeeds.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::command::InvalidCommand;

/// Identifier of an application on the display.  Opaque; may be numeric
/// (`3201907018807`) or a package-like name (`youtube.leanback.v4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn parse(raw: &str) -> Result<Self, InvalidCommand> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidCommand::EmptyAppId);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One installed application as reported by the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: AppId,
    pub name: String,
}

impl AppDescriptor {
    pub fn new(id: AppId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

const NETFLIX: &[&str] = &["3201907018807", "11101200001", "Netflix", "netflixui2"];
const YOUTUBE: &[&str] = &[
    "3201907018745",
    "111299001912",
    "YouTube",
    "youtube.leanback.v4",
];
const PRIME_VIDEO: &[&str] = &[
    "3201512006785",
    "3201909019271",
    "PrimeVideo",
    "AmazonInstantVideo",
];
const PRIME_SHORT: &[&str] = &[
    "3201512006785",
    "3201909019271",
    "amazon",
    "PrimeVideo",
    "AmazonInstantVideo",
];
const HOTSTAR: &[&str] = &["3201708012872", "Hotstar", "hotstar"];
const DISNEY_PLUS: &[&str] = &["3201901017640", "DisneyPlus"];

/// Well-known app ids for a common app name, most likely first.
///
/// The lookup is case-insensitive and ignores surrounding whitespace.
/// Unknown names yield an empty slice.
pub fn well_known_app_ids(name: &str) -> &'static [&'static str] {
    match name.trim().to_lowercase().as_str() {
        "netflix" => NETFLIX,
        "youtube" => YOUTUBE,
        "prime" => PRIME_SHORT,
        "prime video" | "amazon prime video" => PRIME_VIDEO,
        "hotstar" => HOTSTAR,
        "disney" | "disney+" | "disney plus" => DISNEY_PLUS,
        _ => &[],
    }
}

/// Ordered, de-duplicated list of app ids to try for `query`.
///
/// `installed` is the display's own app list; pass an empty slice when it
/// could not be fetched.  An empty query yields no candidates.
pub fn resolve_app_candidates(query: &str, installed: &[AppDescriptor]) -> Vec<AppId> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let exact = installed
        .iter()
        .filter(|app| app.name.to_lowercase() == needle);
    let partial = installed.iter().filter(|app| {
        let name = app.name.to_lowercase();
        name != needle && name.contains(&needle)
    });
    let catalogue = well_known_app_ids(&needle)
        .iter()
        .filter_map(|raw| AppId::parse(raw).ok());

    let mut candidates: Vec<AppId> = Vec::new();
    for id in exact
        .chain(partial)
        .map(|app| app.id.clone())
        .chain(catalogue)
    {
        if !candidates.contains(&id) {
            candidates.push(id);
        }
    }
    debug!(query, count = candidates.len(), "resolved app candidates");
    candidates
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: &str) -> AppDescriptor {
        AppDescriptor::new(AppId::parse(id).unwrap(), name)
    }

    fn ids(candidates: &[AppId]) -> Vec<&str> {
        candidates.iter().map(AppId::as_str).collect()
    }

    #[test]
    fn test_app_id_rejects_blank() {
        assert_eq!(AppId::parse("  "), Err(InvalidCommand::EmptyAppId));
    }

    #[test]
    fn test_catalogue_lookup_is_case_insensitive() {
        assert_eq!(well_known_app_ids("  NetFlix "), NETFLIX);
        assert!(well_known_app_ids("solitaire").is_empty());
    }

    #[test]
    fn test_exact_match_comes_before_partial_match() {
        // Arrange
        let installed = vec![
            app("A1", "YouTube Kids"),
            app("A2", "YouTube"),
            app("A3", "Browser"),
        ];

        // Act
        let candidates = resolve_app_candidates("youtube", &installed);

        // Assert: exact, then partial, then the catalogue
        assert_eq!(&ids(&candidates)[..2], &["A2", "A1"]);
        assert_eq!(candidates.len(), 2 + YOUTUBE.len());
    }

    #[test]
    fn test_falls_back_to_catalogue_when_not_installed() {
        let installed = vec![app("A3", "Browser")];

        let candidates = resolve_app_candidates("Netflix", &installed);

        assert_eq!(ids(&candidates), NETFLIX.to_vec());
    }

    #[test]
    fn test_installed_id_that_is_also_in_catalogue_is_not_repeated() {
        let installed = vec![app("3201907018807", "Netflix")];

        let candidates = resolve_app_candidates("netflix", &installed);

        assert_eq!(ids(&candidates), NETFLIX.to_vec());
    }

    #[test]
    fn test_unknown_app_yields_nothing() {
        assert!(resolve_app_candidates("solitaire", &[app("A3", "Browser")]).is_empty());
        assert!(resolve_app_candidates("   ", &[app("A3", "Browser")]).is_empty());
    }
}
