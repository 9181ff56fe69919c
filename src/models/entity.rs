//! Featured characters and items shown on a banner.

use serde::{Deserialize, Serialize};

/// Placeholder name for an entity whose card could not be read.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Placeholder affinity when a character card has no element icon.
pub const UNKNOWN_AFFINITY: &str = "Unknown";

/// Rarity grade of a character or item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum RarityTier {
    #[default]
    Four,
    Five,
}

impl RarityTier {
    pub fn stars(&self) -> u8 {
        match self {
            RarityTier::Four => 4,
            RarityTier::Five => 5,
        }
    }
}

impl From<RarityTier> for u8 {
    fn from(tier: RarityTier) -> Self {
        tier.stars()
    }
}

impl TryFrom<u8> for RarityTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(RarityTier::Four),
            5 => Ok(RarityTier::Five),
            other => Err(format!("unsupported rarity tier: {}", other)),
        }
    }
}

impl std::fmt::Display for RarityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}★", self.stars())
    }
}

/// A character featured on a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedCharacter {
    pub name: String,
    pub rarity_tier: RarityTier,
    /// Combat element ("Physical", "Quantum", ...)
    pub affinity: String,
    pub image_url: Option<String>,
}

impl FeaturedCharacter {
    /// Record used in place of a card that failed to extract.
    pub fn placeholder(default_image_url: &str) -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            rarity_tier: RarityTier::Four,
            affinity: UNKNOWN_AFFINITY.to_string(),
            image_url: Some(default_image_url.to_string()),
        }
    }
}

/// An item (light cone) featured on a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedItem {
    pub name: String,
    pub rarity_tier: RarityTier,
    pub image_url: Option<String>,
}

impl FeaturedItem {
    /// Record used in place of a card that failed to extract.
    pub fn placeholder(default_image_url: &str) -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            rarity_tier: RarityTier::Four,
            image_url: Some(default_image_url.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_tier_serialization() {
        assert_eq!(serde_json::to_string(&RarityTier::Five).unwrap(), "5");
        assert_eq!(serde_json::to_string(&RarityTier::Four).unwrap(), "4");

        let parsed: RarityTier = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, RarityTier::Five);
    }

    #[test]
    fn test_rarity_tier_rejects_other_values() {
        assert!(serde_json::from_str::<RarityTier>("3").is_err());
        assert!(RarityTier::try_from(6).is_err());
    }

    #[test]
    fn test_rarity_tier_display() {
        assert_eq!(format!("{}", RarityTier::Five), "5★");
        assert_eq!(format!("{}", RarityTier::Four), "4★");
    }

    #[test]
    fn test_character_placeholder() {
        let placeholder = FeaturedCharacter::placeholder("https://example.com/default.png");
        assert_eq!(placeholder.name, "Unknown");
        assert_eq!(placeholder.affinity, "Unknown");
        assert_eq!(placeholder.rarity_tier, RarityTier::Four);
        assert_eq!(
            placeholder.image_url.as_deref(),
            Some("https://example.com/default.png")
        );
    }

    #[test]
    fn test_item_serialization() {
        let item = FeaturedItem {
            name: "Sailing Towards a Second Life".to_string(),
            rarity_tier: RarityTier::Five,
            image_url: None,
        };

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"rarity_tier\":5"));

        let parsed: FeaturedItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }
}
