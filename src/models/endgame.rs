//! Endgame challenge modes shown alongside banners.

use serde::{Deserialize, Serialize};

/// Rotating endgame challenge mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndgameMode {
    MemoryOfChaos,
    PureFiction,
    ApocalypticShadow,
}

impl EndgameMode {
    pub const ALL: [EndgameMode; 3] = [
        EndgameMode::MemoryOfChaos,
        EndgameMode::PureFiction,
        EndgameMode::ApocalypticShadow,
    ];

    /// Name as it appears on the page.
    pub fn label(&self) -> &'static str {
        match self {
            EndgameMode::MemoryOfChaos => "Memory of Chaos",
            EndgameMode::PureFiction => "Pure Fiction",
            EndgameMode::ApocalypticShadow => "Apocalyptic Shadow",
        }
    }

    /// Find the first mode whose label appears in `text`.
    pub fn detect(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| text.contains(mode.label()))
    }
}

impl std::fmt::Display for EndgameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One endgame accordion entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndgameContent {
    /// Full accordion title, e.g. "Memory of Chaos (3.1)"
    pub name: String,

    /// Text of the first parenthesized group in the name; empty if none
    pub version: String,

    /// Countdown text, whitespace collapsed
    pub time_remaining: String,

    pub mode: EndgameMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(
            EndgameMode::detect("Memory of Chaos (3.1)"),
            Some(EndgameMode::MemoryOfChaos)
        );
        assert_eq!(
            EndgameMode::detect("Apocalyptic Shadow: Duel Beyond"),
            Some(EndgameMode::ApocalypticShadow)
        );
        assert_eq!(EndgameMode::detect("Deadly Dancer"), None);
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&EndgameMode::PureFiction).unwrap();
        assert_eq!(json, "\"pure_fiction\"");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(format!("{}", EndgameMode::PureFiction), "Pure Fiction");
    }
}
