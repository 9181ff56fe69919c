//! Whole-page banner extraction.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use super::classifier::{BannerStrategy, LayeredBannerStrategy, Verdict};
use super::duration::DurationParser;
use super::entity::EntityExtractor;
use super::image::ImageResolver;
use super::{collapsed_text, first_text, ExtractError, PageSelectors};
use crate::config::AppConfig;
use crate::models::{BannerRecord, CompositionKind, FeaturedLineup, RarityTier};

static TIER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([45])\s*(?:★|☆|\*|-?\s*stars?)").expect("invalid tier label regex")
});

/// Text used when a banner has no countdown element.
pub const UNKNOWN_REMAINING: &str = "Unknown";

/// Tier announced by a "Featured 5★ character" style label.
pub fn tier_from_label(text: &str) -> Option<RarityTier> {
    TIER_LABEL
        .captures(text)
        .map(|caps| match &caps[1] {
            "5" => RarityTier::Five,
            _ => RarityTier::Four,
        })
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub banners: Vec<BannerRecord>,

    /// Accordion items examined
    pub candidates: usize,

    /// Candidates the classifier turned down
    pub rejected: usize,

    /// Accepted candidates that failed to extract
    pub skipped: usize,

    /// Accepted candidates with no characters or items
    pub empty: usize,

    /// Cards replaced by placeholders
    pub degraded_entities: usize,
}

/// Turns the banner page into `BannerRecord`s.
pub struct BannerExtractor {
    selectors: PageSelectors,
    images: ImageResolver,
    durations: DurationParser,
    strategy: Box<dyn BannerStrategy>,
}

impl BannerExtractor {
    pub fn new(
        selectors: PageSelectors,
        images: ImageResolver,
        durations: DurationParser,
        strategy: Box<dyn BannerStrategy>,
    ) -> Self {
        Self {
            selectors,
            images,
            durations,
            strategy,
        }
    }

    /// Build an extractor with the layered strategy from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let images = ImageResolver::new(&config.source.origin, &config.extraction.default_image_url)
            .map_err(|source| ExtractError::InvalidUrl {
                field: "source.origin",
                source,
            })?;
        let durations = DurationParser::with_offset_hours(
            config.source.utc_offset_hours,
            config.extraction.stale_start_days,
        );
        let strategy = Box::new(LayeredBannerStrategy::from_config(&config.extraction));

        Ok(Self::new(selectors, images, durations, strategy))
    }

    /// Replace the banner classification strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn BannerStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn selectors(&self) -> &PageSelectors {
        &self.selectors
    }

    /// Extract every banner on the page.
    ///
    /// Candidates are processed independently; a failing one is logged and
    /// counted, never fatal.
    pub fn extract(&self, html: &str, now: DateTime<Utc>) -> ExtractionReport {
        let document = Html::parse_document(html);
        let mut report = ExtractionReport::default();

        for (index, candidate) in document.select(&self.selectors.accordion_item).enumerate() {
            report.candidates += 1;

            match self.strategy.evaluate(candidate, &self.selectors) {
                Verdict::Accepted(reason) => {
                    debug!("Accordion {} accepted by {}: {:?}", index, self.strategy.name(), reason);
                }
                Verdict::Rejected(reason) => {
                    debug!("Accordion {} rejected: {}", index, reason);
                    report.rejected += 1;
                    continue;
                }
            }

            match self.extract_banner(candidate, now, &mut report.degraded_entities) {
                Ok(Some(banner)) => report.banners.push(banner),
                Ok(None) => report.empty += 1,
                Err(e) => {
                    warn!("Skipping accordion {}: {}", index, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Extracted {} banners from {} candidates ({} rejected, {} skipped, {} empty, {} degraded cards)",
            report.banners.len(),
            report.candidates,
            report.rejected,
            report.skipped,
            report.empty,
            report.degraded_entities
        );

        report
    }

    /// Convenience wrapper returning only the banners.
    pub fn extract_banners(&self, html: &str, now: DateTime<Utc>) -> Vec<BannerRecord> {
        self.extract(html, now).banners
    }

    /// Assemble one accepted candidate. `Ok(None)` means nothing was featured.
    fn extract_banner(
        &self,
        candidate: ElementRef<'_>,
        now: DateTime<Utc>,
        degraded: &mut usize,
    ) -> Result<Option<BannerRecord>, ExtractError> {
        let display_name = first_text(&candidate, &self.selectors.event_name)
            .ok_or(ExtractError::MissingElement("event name"))?;

        let raw_duration_text = first_text(&candidate, &self.selectors.duration).unwrap_or_default();
        let remaining_time_text = first_text(&candidate, &self.selectors.remaining_time)
            .unwrap_or_else(|| UNKNOWN_REMAINING.to_string());

        let lineup = self.collect_lineup(candidate, degraded);
        if lineup.composition() == CompositionKind::Unclassified {
            debug!("Banner {:?} accepted but featured nothing", display_name);
            return Ok(None);
        }

        let span = self.durations.parse_lenient(&raw_duration_text, now);

        Ok(BannerRecord::new(
            display_name,
            raw_duration_text,
            remaining_time_text,
            span.start,
            span.end,
            lineup,
        ))
    }

    /// Walk the candidate in document order, filing each card under the
    /// tier of the nearest preceding featured label. The filed tier is also
    /// written back to the record.
    fn collect_lineup(&self, candidate: ElementRef<'_>, degraded: &mut usize) -> FeaturedLineup {
        let entities = EntityExtractor::new(&self.selectors, &self.images);
        let mut lineup = FeaturedLineup::default();
        let mut section_tier: Option<RarityTier> = None;

        for element in candidate.descendants().skip(1).filter_map(ElementRef::wrap) {
            if self.selectors.featured_label.matches(&element) {
                section_tier = tier_from_label(&collapsed_text(&element));
            } else if self.selectors.character_card.matches(&element) {
                let outcome = entities.character_or_placeholder(element);
                if outcome.is_degraded() {
                    *degraded += 1;
                }
                let mut character = outcome.into_inner();
                character.rarity_tier = section_tier.unwrap_or(character.rarity_tier);
                lineup.push_character(character.rarity_tier, character);
            } else if self.selectors.item_card.matches(&element) {
                let outcome = entities.item_or_placeholder(element);
                if outcome.is_degraded() {
                    *degraded += 1;
                }
                let mut item = outcome.into_inner();
                item.rarity_tier = section_tier.unwrap_or(item.rarity_tier);
                lineup.push_item(item.rarity_tier, item);
            }
        }

        lineup
    }
}
