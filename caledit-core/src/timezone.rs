//! Timezone definitions exchanged with calendar stores.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A timezone known to a store, identified by the TZID components use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timezone {
    pub tzid: String,
    /// IANA location name the TZID resolves to
    pub location: String,
}

impl Timezone {
    /// Look a TZID up in the builtin timezone table.
    pub fn builtin(tzid: &str) -> Option<Self> {
        let tz = resolve_builtin(tzid)?;
        Some(Timezone {
            tzid: tzid.to_string(),
            location: tz.name().to_string(),
        })
    }

    pub fn tz(&self) -> Option<Tz> {
        self.location.parse().ok()
    }
}

/// Resolve a TZID against the builtin table.
///
/// Accepts plain IANA names as well as vendor-prefixed TZIDs such as
/// `/freeassociation.sourceforge.net/Tzfile/Europe/Berlin`, by trying
/// successively shorter path suffixes.
pub fn resolve_builtin(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim();
    if tzid.is_empty() {
        return None;
    }
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }

    let trimmed = tzid.trim_start_matches('/');
    trimmed
        .match_indices('/')
        .map(|(i, _)| &trimmed[i + 1..])
        .find_map(|suffix| suffix.parse::<Tz>().ok())
}
