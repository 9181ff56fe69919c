//! # Banner Watch
//!
//! Scrapes the Honkai: Star Rail fan wiki for limited-time warp banners and
//! turns them into structured records.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (banners, characters, light cones, endgame modes)
//! - **extract**: HTML extraction pipeline (durations, images, entities, classifier)
//! - **temporal**: Active / upcoming / expired classification
//! - **fetch**: HTTP fetching with snapshot caching
//! - **service**: Fetch + extract facade
//! - **storage**: Announcement ledger (JSONL)
//! - **sync**: Periodic announcement of new banners
//! - **config**: Configuration loading and validation

pub mod config;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod service;
pub mod storage;
pub mod sync;
pub mod temporal;

pub use models::*;
pub use service::{BannerService, ServiceError};
pub use temporal::{classify_by_time, TemporalState, TimeBuckets};

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "1d", "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, 86400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num * multiplier))
}
