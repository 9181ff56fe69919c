//! Banner records assembled from the wiki page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FeaturedCharacter, FeaturedItem, RarityTier, StableId};

/// What a banner features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    CharacterOnly,
    ItemOnly,
    Mixed,
    /// Accepted as a banner but nothing was extracted from it
    #[default]
    Unclassified,
}

impl CompositionKind {
    /// Derive the kind from whether characters and/or items were found.
    pub fn from_contents(has_characters: bool, has_items: bool) -> Self {
        match (has_characters, has_items) {
            (true, true) => CompositionKind::Mixed,
            (true, false) => CompositionKind::CharacterOnly,
            (false, true) => CompositionKind::ItemOnly,
            (false, false) => CompositionKind::Unclassified,
        }
    }
}

impl std::fmt::Display for CompositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositionKind::CharacterOnly => write!(f, "character"),
            CompositionKind::ItemOnly => write!(f, "light cone"),
            CompositionKind::Mixed => write!(f, "character + light cone"),
            CompositionKind::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Featured characters and items partitioned by rarity tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeaturedLineup {
    pub characters5: Vec<FeaturedCharacter>,
    pub characters4: Vec<FeaturedCharacter>,
    pub items5: Vec<FeaturedItem>,
    pub items4: Vec<FeaturedItem>,
}

impl FeaturedLineup {
    pub fn push_character(&mut self, tier: RarityTier, character: FeaturedCharacter) {
        match tier {
            RarityTier::Five => self.characters5.push(character),
            RarityTier::Four => self.characters4.push(character),
        }
    }

    pub fn push_item(&mut self, tier: RarityTier, item: FeaturedItem) {
        match tier {
            RarityTier::Five => self.items5.push(item),
            RarityTier::Four => self.items4.push(item),
        }
    }

    pub fn has_characters(&self) -> bool {
        !self.characters5.is_empty() || !self.characters4.is_empty()
    }

    pub fn has_items(&self) -> bool {
        !self.items5.is_empty() || !self.items4.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_characters() && !self.has_items()
    }

    pub fn composition(&self) -> CompositionKind {
        CompositionKind::from_contents(self.has_characters(), self.has_items())
    }
}

/// A promotional banner scraped from the source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerRecord {
    /// Banner title as shown on the page
    pub display_name: String,

    pub composition_kind: CompositionKind,

    /// Duration text exactly as scraped
    pub raw_duration_text: String,

    /// Parsed from `raw_duration_text`; None when unparseable
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    /// Countdown text shown by the page. Independent of start/end.
    pub remaining_time_text: String,

    pub characters5: Vec<FeaturedCharacter>,
    pub characters4: Vec<FeaturedCharacter>,
    pub items5: Vec<FeaturedItem>,
    pub items4: Vec<FeaturedItem>,

    /// Derived from `display_name`
    pub stable_id: StableId,
}

impl BannerRecord {
    /// Assemble a record, or None if the lineup is empty.
    pub fn new(
        display_name: String,
        raw_duration_text: String,
        remaining_time_text: String,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        lineup: FeaturedLineup,
    ) -> Option<Self> {
        if lineup.is_empty() {
            return None;
        }

        let composition_kind = lineup.composition();
        let stable_id = StableId::from_display_name(&display_name);
        let FeaturedLineup {
            characters5,
            characters4,
            items5,
            items4,
        } = lineup;

        Some(Self {
            display_name,
            composition_kind,
            raw_duration_text,
            start_time,
            end_time,
            remaining_time_text,
            characters5,
            characters4,
            items5,
            items4,
            stable_id,
        })
    }

    /// All featured characters, 5★ first.
    pub fn characters(&self) -> impl Iterator<Item = &FeaturedCharacter> {
        self.characters5.iter().chain(self.characters4.iter())
    }

    /// All featured items, 5★ first.
    pub fn items(&self) -> impl Iterator<Item = &FeaturedItem> {
        self.items5.iter().chain(self.items4.iter())
    }

    /// Whether both bounds failed to parse.
    pub fn is_undated(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn character(name: &str, tier: RarityTier) -> FeaturedCharacter {
        FeaturedCharacter {
            name: name.to_string(),
            rarity_tier: tier,
            affinity: "Physical".to_string(),
            image_url: None,
        }
    }

    fn item(name: &str, tier: RarityTier) -> FeaturedItem {
        FeaturedItem {
            name: name.to_string(),
            rarity_tier: tier,
            image_url: None,
        }
    }

    #[test]
    fn test_composition_from_contents() {
        assert_eq!(
            CompositionKind::from_contents(true, false),
            CompositionKind::CharacterOnly
        );
        assert_eq!(
            CompositionKind::from_contents(false, true),
            CompositionKind::ItemOnly
        );
        assert_eq!(
            CompositionKind::from_contents(true, true),
            CompositionKind::Mixed
        );
        assert_eq!(
            CompositionKind::from_contents(false, false),
            CompositionKind::Unclassified
        );
    }

    #[test]
    fn test_lineup_one_character_is_character_only() {
        let mut lineup = FeaturedLineup::default();
        lineup.push_character(RarityTier::Five, character("Boothill", RarityTier::Five));
        assert_eq!(lineup.composition(), CompositionKind::CharacterOnly);
    }

    #[test]
    fn test_lineup_one_of_each_is_mixed() {
        let mut lineup = FeaturedLineup::default();
        lineup.push_character(RarityTier::Five, character("Boothill", RarityTier::Five));
        lineup.push_item(
            RarityTier::Five,
            item("Sailing Towards a Second Life", RarityTier::Five),
        );
        assert_eq!(lineup.composition(), CompositionKind::Mixed);
    }

    #[test]
    fn test_lineup_partitions_by_tier() {
        let mut lineup = FeaturedLineup::default();
        lineup.push_character(RarityTier::Five, character("Boothill", RarityTier::Five));
        lineup.push_character(RarityTier::Four, character("Pela", RarityTier::Four));
        lineup.push_item(RarityTier::Four, item("Resolution Shines", RarityTier::Four));

        assert_eq!(lineup.characters5.len(), 1);
        assert_eq!(lineup.characters4.len(), 1);
        assert!(lineup.items5.is_empty());
        assert_eq!(lineup.items4.len(), 1);
    }

    #[test]
    fn test_banner_record_requires_content() {
        let record = BannerRecord::new(
            "Empty".to_string(),
            String::new(),
            String::new(),
            None,
            None,
            FeaturedLineup::default(),
        );
        assert!(record.is_none());
    }

    #[test]
    fn test_banner_record_assembly() {
        let mut lineup = FeaturedLineup::default();
        lineup.push_character(RarityTier::Five, character("Boothill", RarityTier::Five));

        let start = Utc.with_ymd_and_hms(2026, 1, 25, 4, 0, 0).unwrap();
        let record = BannerRecord::new(
            "Deadly Dancer".to_string(),
            "2026/01/25 04:00 - 2026/02/16 03:59".to_string(),
            "12d 4h".to_string(),
            Some(start),
            None,
            lineup,
        )
        .unwrap();

        assert_eq!(record.stable_id.as_str(), "deadlydancer");
        assert_eq!(record.composition_kind, CompositionKind::CharacterOnly);
        assert_eq!(record.characters().count(), 1);
        assert_eq!(record.items().count(), 0);
        assert!(!record.is_undated());
    }

    #[test]
    fn test_banner_record_serialization() {
        let mut lineup = FeaturedLineup::default();
        lineup.push_item(RarityTier::Five, item("Along the Passing Shore", RarityTier::Five));

        let record = BannerRecord::new(
            "Brilliant Fixation".to_string(),
            "Always available".to_string(),
            "Unknown".to_string(),
            None,
            None,
            lineup,
        )
        .unwrap();

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"composition_kind\":\"item_only\""));

        let parsed: BannerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.is_undated());
    }
}
