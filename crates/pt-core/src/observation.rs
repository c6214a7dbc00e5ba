//! Observation model, timestamp codec, and user identity normalization.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Storage format for timestamps: local time, second precision.
///
/// Lexicographic ordering of formatted values matches chronological
/// ordering, so SQL string comparisons over the `timestamp` column are
/// valid range filters.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The only status value ever written. Offline is inferred by absence;
/// no explicit offline rows exist.
pub const ONLINE_STATUS: &str = "Online";

/// One timestamped "user seen online" fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    /// Display name as captured by the scanner. Identity comparisons go
    /// through [`user_key`], never through this field directly.
    pub name: String,
}

impl Observation {
    #[must_use]
    pub fn new(timestamp: NaiveDateTime, name: impl Into<String>) -> Self {
        Self {
            timestamp,
            name: name.into(),
        }
    }

    /// Canonical identity key for this observation's user.
    #[must_use]
    pub fn key(&self) -> String {
        user_key(&self.name)
    }
}

/// Parses a stored timestamp string.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

/// Formats a timestamp for storage.
#[must_use]
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Derives the canonical identity key from a free-text display name.
///
/// Case is folded and runs of whitespace collapse to a single underscore,
/// so minor text variation between scans ("Alice Smith", "alice  smith")
/// maps to one state-machine entry.
#[must_use]
pub fn user_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
