//! Endgame-mode countdowns.
//!
//! Memory of Chaos, Pure Fiction and Apocalyptic Shadow share the banner
//! accordion layout. They carry a name with the version in parentheses and a
//! countdown, nothing else.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};

use super::duration::{find_dates, parse_naive};
use super::{first_text, PageSelectors};
use crate::models::{EndgameContent, EndgameMode};

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("invalid version regex"));

/// Countdown text when the accordion has none.
pub const UNKNOWN_TIME: &str = "Unknown";

/// Extracts endgame entries from the banner page.
#[derive(Debug, Clone)]
pub struct EndgameExtractor {
    selectors: PageSelectors,

    /// Shift for dates embedded in countdown text; None leaves text untouched
    countdown_offset: Option<Duration>,
}

impl EndgameExtractor {
    pub fn new(selectors: PageSelectors, countdown_offset_minutes: i64) -> Self {
        let countdown_offset = match countdown_offset_minutes {
            0 => None,
            minutes => Duration::try_minutes(minutes).or_else(|| {
                warn!("Countdown offset {} minutes out of range, ignoring", minutes);
                None
            }),
        };
        Self {
            selectors,
            countdown_offset,
        }
    }

    /// Every accordion whose name mentions an endgame mode, in page order.
    pub fn extract(&self, html: &str) -> Vec<EndgameContent> {
        let document = Html::parse_document(html);
        let mut entries = Vec::new();

        for candidate in document.select(&self.selectors.accordion_item) {
            let Some(name) = first_text(&candidate, &self.selectors.event_name) else {
                continue;
            };
            let Some(mode) = EndgameMode::detect(&name) else {
                continue;
            };

            let time_remaining = first_text(&candidate, &self.selectors.remaining_time)
                .unwrap_or_else(|| UNKNOWN_TIME.to_string());
            let time_remaining = match self.countdown_offset {
                Some(offset) => shift_embedded_date(&time_remaining, offset),
                None => time_remaining,
            };

            debug!("Endgame {}: {}", mode, time_remaining);

            entries.push(EndgameContent {
                version: version_of(&name),
                name,
                time_remaining,
                mode,
            });
        }

        info!("Found {} endgame entries", entries.len());
        entries
    }
}

/// Text inside the first parentheses of `name`, or empty.
pub fn version_of(name: &str) -> String {
    VERSION
        .captures(name)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default()
}

/// Shift the first `YYYY/MM/DD[ HH:MM]` date in `text` by `offset`.
///
/// The text is returned unchanged when the shifted date is not representable.
pub fn shift_embedded_date(text: &str, offset: Duration) -> String {
    let Some(date_text) = find_dates(text).into_iter().next() else {
        return text.to_string();
    };
    let Some(naive) = parse_naive(date_text) else {
        return text.to_string();
    };

    let Some(shifted) = naive.checked_add_signed(offset) else {
        return text.to_string();
    };
    let shifted = shifted.format("%Y/%m/%d %H:%M").to_string();
    text.replacen(date_text, &shifted, 1)
}
