//! Deciding which accordion items are real banners.
//!
//! The page puts banners, game-mode schedules and patch notes into the same
//! collapsible containers. No single attribute separates them, so acceptance
//! is an OR of independent structural signals, guarded by a deny list of
//! known non-banner markers and short-circuited by an optional allow list of
//! banner names.

use scraper::ElementRef;

use super::{first_text, PageSelectors};
use crate::config::ExtractionConfig;

/// Structural hint that an accordion features characters or items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturedSignal {
    TierLabel,
    CharacterCard,
    ItemImage,
}

/// Why an accordion was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptReason {
    AllowListed(String),
    Featured(FeaturedSignal),
}

/// Why an accordion was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NonBannerMarker(String),
    MissingName,
    MissingDuration,
    NoFeaturedContent,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NonBannerMarker(marker) => write!(f, "non-banner marker {:?}", marker),
            RejectReason::MissingName => write!(f, "no display name"),
            RejectReason::MissingDuration => write!(f, "no duration"),
            RejectReason::NoFeaturedContent => write!(f, "no featured content"),
        }
    }
}

/// Classifier decision for one accordion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(AcceptReason),
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

/// Strategy deciding whether an accordion is a banner.
pub trait BannerStrategy: Send + Sync {
    /// Strategy identifier for logging.
    fn name(&self) -> &'static str;

    fn evaluate(&self, candidate: ElementRef<'_>, selectors: &PageSelectors) -> Verdict;
}

/// Deny list, then allow list, then structural prerequisites and signals.
#[derive(Debug, Clone, Default)]
pub struct LayeredBannerStrategy {
    non_banner_markers: Vec<String>,
    allow_list: Vec<String>,
}

impl LayeredBannerStrategy {
    pub fn new(non_banner_markers: Vec<String>, allow_list: Vec<String>) -> Self {
        Self {
            non_banner_markers,
            allow_list,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.non_banner_markers.clone(), config.allow_list.clone())
    }
}

impl BannerStrategy for LayeredBannerStrategy {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn evaluate(&self, candidate: ElementRef<'_>, selectors: &PageSelectors) -> Verdict {
        if let Some(marker) = find_non_banner_marker(&candidate.html(), &self.non_banner_markers) {
            return Verdict::Rejected(RejectReason::NonBannerMarker(marker.to_string()));
        }

        let Some(name) = first_text(&candidate, &selectors.event_name) else {
            return Verdict::Rejected(RejectReason::MissingName);
        };

        if let Some(entry) = allow_list_match(&name, &self.allow_list) {
            return Verdict::Accepted(AcceptReason::AllowListed(entry.to_string()));
        }

        if candidate.select(&selectors.duration).next().is_none() {
            return Verdict::Rejected(RejectReason::MissingDuration);
        }

        match featured_signal(candidate, selectors) {
            Some(signal) => Verdict::Accepted(AcceptReason::Featured(signal)),
            None => Verdict::Rejected(RejectReason::NoFeaturedContent),
        }
    }
}

/// First configured marker present in the serialized markup.
pub fn find_non_banner_marker<'m>(markup: &str, markers: &'m [String]) -> Option<&'m str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| !marker.is_empty() && markup.contains(marker))
}

/// Allow-list entry contained in `name`, compared case-insensitively.
pub fn allow_list_match<'m>(name: &str, allow_list: &'m [String]) -> Option<&'m str> {
    let name = name.to_lowercase();
    allow_list
        .iter()
        .map(String::as_str)
        .find(|entry| !entry.trim().is_empty() && name.contains(&entry.trim().to_lowercase()))
}

/// First featured-content signal found under `candidate`.
pub fn featured_signal(candidate: ElementRef<'_>, selectors: &PageSelectors) -> Option<FeaturedSignal> {
    if candidate.select(&selectors.featured_label).next().is_some() {
        Some(FeaturedSignal::TierLabel)
    } else if candidate.select(&selectors.character_card).next().is_some() {
        Some(FeaturedSignal::CharacterCard)
    } else if candidate.select(&selectors.item_image).next().is_some() {
        Some(FeaturedSignal::ItemImage)
    } else {
        None
    }
}
