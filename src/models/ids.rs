//! Deterministic banner IDs derived from display names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable banner identifier.
///
/// Derived from the display name by lowercasing and dropping every
/// non-alphanumeric character, so repeated scrapes of the same banner map to
/// the same id regardless of case, spacing or punctuation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Derive the id for a banner display name.
    pub fn from_display_name(name: &str) -> Self {
        let id = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        Self(id)
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StableId({})", self.0)
    }
}

impl From<&str> for StableId {
    fn from(name: &str) -> Self {
        Self::from_display_name(name)
    }
}
