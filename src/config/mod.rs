//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::EndgameMode;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Upper bound for `extraction.stale_start_days`.
pub const MAX_STALE_START_DAYS: i64 = 3650;

/// Upper bound for the magnitude of `endgame.countdown_offset_minutes` (one week).
pub const MAX_COUNTDOWN_OFFSET_MINUTES: i64 = 7 * 24 * 60;

/// Where and how the banner page is fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page listing the current banners
    #[serde(default = "default_page_url")]
    pub page_url: String,

    /// Site origin used to absolutize relative image paths
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum page size in bytes
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,

    /// How long a cached page snapshot stays fresh. 0 disables the cache.
    #[serde(default)]
    pub cache_ttl_seconds: u64,

    /// UTC offset of the wall-clock times printed on the page
    #[serde(default)]
    pub utc_offset_hours: i32,
}

fn default_page_url() -> String {
    "https://www.prydwen.gg/star-rail/".to_string()
}

fn default_origin() -> String {
    "https://www.prydwen.gg".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_content_size() -> usize {
    10 * 1024 * 1024
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            max_content_size: default_max_content_size(),
            cache_ttl_seconds: 0,
            utc_offset_hours: 0,
        }
    }
}

/// Tuning for the banner heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Image used when a card has no resolvable image
    #[serde(default = "default_image_url")]
    pub default_image_url: String,

    /// Days before "now" assumed as the start when only an end date is published
    #[serde(default = "default_stale_start_days")]
    pub stale_start_days: i64,

    /// Accordion markup containing any of these is never a banner
    #[serde(default = "default_non_banner_markers")]
    pub non_banner_markers: Vec<String>,

    /// Banner name substrings accepted regardless of structure
    #[serde(default)]
    pub allow_list: Vec<String>,
}

fn default_image_url() -> String {
    "https://www.prydwen.gg/static/default-avatar.png".to_string()
}

fn default_stale_start_days() -> i64 {
    20
}

fn default_non_banner_markers() -> Vec<String> {
    let mut markers = vec!["Memory Turbulence".to_string(), "Description:".to_string()];
    markers.extend(EndgameMode::ALL.iter().map(|mode| mode.label().to_string()));
    markers
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_image_url: default_image_url(),
            stale_start_days: default_stale_start_days(),
            non_banner_markers: default_non_banner_markers(),
            allow_list: Vec::new(),
        }
    }
}

/// CSS selectors for the page layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Collapsible container that may hold a banner
    pub accordion_item: String,
    pub event_name: String,
    pub duration: String,
    pub remaining_time: String,
    /// "Featured 5★ character" style section label
    pub featured_label: String,
    pub character_card: String,
    pub character_link: String,
    /// Span holding the element icon inside a character card
    pub element_marker: String,
    pub item_card: String,
    pub item_image: String,
    pub item_name: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            accordion_item: ".accordion-item".to_string(),
            event_name: ".event-name".to_string(),
            duration: ".duration".to_string(),
            remaining_time: ".time".to_string(),
            featured_label: ".featured".to_string(),
            character_card: ".avatar-card".to_string(),
            character_link: "a[href]".to_string(),
            element_marker: ".floating-element".to_string(),
            item_card: ".featured-cone".to_string(),
            item_image: ".hsr-set-image".to_string(),
            item_name: ".hsr-set-name".to_string(),
        }
    }
}

impl SelectorConfig {
    /// (field name, selector) pairs, for validation and error messages.
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("accordion_item", self.accordion_item.as_str()),
            ("event_name", self.event_name.as_str()),
            ("duration", self.duration.as_str()),
            ("remaining_time", self.remaining_time.as_str()),
            ("featured_label", self.featured_label.as_str()),
            ("character_card", self.character_card.as_str()),
            ("character_link", self.character_link.as_str()),
            ("element_marker", self.element_marker.as_str()),
            ("item_card", self.item_card.as_str()),
            ("item_image", self.item_image.as_str()),
            ("item_name", self.item_name.as_str()),
        ]
    }
}

/// Endgame countdown extraction.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndgameConfig {
    /// Shift applied to dates embedded in endgame countdown text
    #[serde(default)]
    pub countdown_offset_minutes: i64,
}

/// Periodic sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Interval between syncs (e.g., "24h", "30m")
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "24h".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub selectors: SelectorConfig,

    #[serde(default)]
    pub endgame: EndgameConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            source: SourceConfig::default(),
            extraction: ExtractionConfig::default(),
            selectors: SelectorConfig::default(),
            endgame: EndgameConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Source timeout must be greater than 0".to_string(),
            ));
        }

        for (field, value) in [
            ("source.page_url", &self.source.page_url),
            ("source.origin", &self.source.origin),
            ("extraction.default_image_url", &self.extraction.default_image_url),
        ] {
            Url::parse(value).map_err(|e| {
                ConfigError::ValidationError(format!("{} is not a valid URL ({}): {}", field, e, value))
            })?;
        }

        if !(-12..=14).contains(&self.source.utc_offset_hours) {
            return Err(ConfigError::ValidationError(format!(
                "UTC offset out of range: {}",
                self.source.utc_offset_hours
            )));
        }

        if !(0..=MAX_STALE_START_DAYS).contains(&self.extraction.stale_start_days) {
            return Err(ConfigError::ValidationError(format!(
                "stale_start_days must be between 0 and {}: {}",
                MAX_STALE_START_DAYS, self.extraction.stale_start_days
            )));
        }

        if !(-MAX_COUNTDOWN_OFFSET_MINUTES..=MAX_COUNTDOWN_OFFSET_MINUTES)
            .contains(&self.endgame.countdown_offset_minutes)
        {
            return Err(ConfigError::ValidationError(format!(
                "countdown_offset_minutes must be within ±{}: {}",
                MAX_COUNTDOWN_OFFSET_MINUTES, self.endgame.countdown_offset_minutes
            )));
        }

        if let Some((field, _)) = self
            .selectors
            .entries()
            .into_iter()
            .find(|(_, css)| css.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "Selector {} must not be empty",
                field
            )));
        }

        parse_interval(&self.schedule.interval)?;

        Ok(())
    }
}

/// Parse a sync interval, rejecting unparseable and zero values.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    match crate::parse_duration(s) {
        Some(interval) if !interval.is_zero() => Ok(interval),
        Some(_) => Err(ConfigError::ValidationError(format!(
            "Schedule interval must be greater than 0: {}",
            s
        ))),
        None => Err(ConfigError::ValidationError(format!(
            "Invalid schedule interval: {}",
            s
        ))),
    }
}
