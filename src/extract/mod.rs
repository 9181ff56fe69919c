//! Banner extraction from the wiki's HTML.
//!
//! The page interleaves promotional banners with unrelated sections inside
//! near-identical accordion containers. Extraction runs in layers:
//!
//! - **duration**: free-text duration → (start, end)
//! - **image**: responsive image markup → one absolute URL
//! - **entity**: character / light cone card → record
//! - **classifier**: accordion → banner or not
//! - **pipeline**: whole page → `Vec<BannerRecord>`
//! - **endgame**: endgame-mode countdowns from the same layout

pub mod classifier;
pub mod duration;
pub mod endgame;
pub mod entity;
pub mod image;
pub mod pipeline;

use scraper::{ElementRef, Selector};
use thiserror::Error;

use crate::config::SelectorConfig;

pub use classifier::{AcceptReason, BannerStrategy, FeaturedSignal, LayeredBannerStrategy, RejectReason, Verdict};
pub use duration::{DurationError, DurationParser, DurationSpan};
pub use endgame::EndgameExtractor;
pub use entity::{EntityExtractor, EntityOutcome};
pub use image::{ImageError, ImageResolver};
pub use pipeline::{BannerExtractor, ExtractionReport};

/// Errors that can occur while extracting records from markup.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector for {field}: {css}")]
    InvalidSelector { field: &'static str, css: String },

    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Element has no usable text: {0}")]
    EmptyText(&'static str),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Duration error: {0}")]
    Duration(#[from] DurationError),
}

/// Compiled CSS selectors for the page layout.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub accordion_item: Selector,
    pub event_name: Selector,
    pub duration: Selector,
    pub remaining_time: Selector,
    pub featured_label: Selector,
    pub character_card: Selector,
    pub character_link: Selector,
    pub element_marker: Selector,
    pub item_card: Selector,
    pub item_image: Selector,
    pub item_name: Selector,
}

impl PageSelectors {
    /// Compile every configured selector.
    pub fn compile(config: &SelectorConfig) -> Result<Self, ExtractError> {
        fn parse(field: &'static str, css: &str) -> Result<Selector, ExtractError> {
            Selector::parse(css).map_err(|_| ExtractError::InvalidSelector {
                field,
                css: css.to_string(),
            })
        }

        Ok(Self {
            accordion_item: parse("accordion_item", &config.accordion_item)?,
            event_name: parse("event_name", &config.event_name)?,
            duration: parse("duration", &config.duration)?,
            remaining_time: parse("remaining_time", &config.remaining_time)?,
            featured_label: parse("featured_label", &config.featured_label)?,
            character_card: parse("character_card", &config.character_card)?,
            character_link: parse("character_link", &config.character_link)?,
            element_marker: parse("element_marker", &config.element_marker)?,
            item_card: parse("item_card", &config.item_card)?,
            item_image: parse("item_image", &config.item_image)?,
            item_name: parse("item_name", &config.item_name)?,
        })
    }
}

impl Default for PageSelectors {
    fn default() -> Self {
        // The built-in selectors are static and known to parse.
        Self::compile(&SelectorConfig::default()).expect("default selectors are valid")
    }
}

/// Element text with runs of whitespace collapsed to single spaces.
pub(crate) fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapsed text of the first match of `selector` under `root`, if non-empty.
pub(crate) fn first_text(root: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .next()
        .map(|el| collapsed_text(&el))
        .filter(|text| !text.is_empty())
}
