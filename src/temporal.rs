//! Time-based bucketing of banners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BannerRecord;

/// Where a banner sits relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalState {
    Active,
    Upcoming,
    Expired,
    /// Neither bound is known
    Unknown,
}

impl std::fmt::Display for TemporalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemporalState::Active => write!(f, "active"),
            TemporalState::Upcoming => write!(f, "upcoming"),
            TemporalState::Expired => write!(f, "expired"),
            TemporalState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a (start, end) pair against `now`.
///
/// A banner with only a past start and no end is treated as active.
pub fn temporal_state(
    now: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> TemporalState {
    match (start, end) {
        (_, Some(end)) if end <= now => TemporalState::Expired,
        (Some(start), _) if start > now => TemporalState::Upcoming,
        (_, Some(_)) => TemporalState::Active,
        (None, None) => TemporalState::Unknown,
        (Some(_), None) => TemporalState::Active,
    }
}

impl BannerRecord {
    pub fn temporal_state(&self, now: DateTime<Utc>) -> TemporalState {
        temporal_state(now, self.start_time, self.end_time)
    }
}

/// Banners worth showing, grouped by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBuckets {
    pub active: Vec<BannerRecord>,
    pub upcoming: Vec<BannerRecord>,
    /// Banners without parseable dates; shown with their countdown text
    pub undated: Vec<BannerRecord>,
}

impl TimeBuckets {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.upcoming.is_empty() && self.undated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.upcoming.len() + self.undated.len()
    }

    /// All banners, active first.
    pub fn iter(&self) -> impl Iterator<Item = &BannerRecord> {
        self.active
            .iter()
            .chain(self.upcoming.iter())
            .chain(self.undated.iter())
    }
}

/// Split banners into active and upcoming, dropping expired ones.
pub fn classify_by_time(banners: &[BannerRecord], now: DateTime<Utc>) -> TimeBuckets {
    let mut buckets = TimeBuckets::default();

    for banner in banners {
        match banner.temporal_state(now) {
            TemporalState::Active => buckets.active.push(banner.clone()),
            TemporalState::Upcoming => buckets.upcoming.push(banner.clone()),
            TemporalState::Unknown => buckets.undated.push(banner.clone()),
            TemporalState::Expired => {}
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeaturedCharacter, FeaturedLineup, RarityTier};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn banner(name: &str, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> BannerRecord {
        let mut lineup = FeaturedLineup::default();
        lineup.push_character(
            RarityTier::Five,
            FeaturedCharacter {
                name: "Boothill".to_string(),
                rarity_tier: RarityTier::Five,
                affinity: "Physical".to_string(),
                image_url: None,
            },
        );
        BannerRecord::new(
            name.to_string(),
            String::new(),
            "Unknown".to_string(),
            start,
            end,
            lineup,
        )
        .unwrap()
    }

    #[test]
    fn test_expired_when_end_passed() {
        let state = temporal_state(now(), None, Some(now() - Duration::seconds(1)));
        assert_eq!(state, TemporalState::Expired);
    }

    #[test]
    fn test_expired_when_end_is_now() {
        assert_eq!(
            temporal_state(now(), Some(now() - Duration::days(3)), Some(now())),
            TemporalState::Expired
        );
    }

    #[test]
    fn test_upcoming_when_start_in_future() {
        let state = temporal_state(
            now(),
            Some(now() + Duration::hours(1)),
            Some(now() + Duration::days(1)),
        );
        assert_eq!(state, TemporalState::Upcoming);
    }

    #[test]
    fn test_active_without_start() {
        let state = temporal_state(now(), None, Some(now() + Duration::days(1)));
        assert_eq!(state, TemporalState::Active);
    }

    #[test]
    fn test_unknown_without_bounds() {
        assert_eq!(temporal_state(now(), None, None), TemporalState::Unknown);
    }

    #[test]
    fn test_started_without_end_is_active() {
        assert_eq!(
            temporal_state(now(), Some(now() - Duration::days(1)), None),
            TemporalState::Active
        );
        assert_eq!(
            temporal_state(now(), Some(now() + Duration::days(1)), None),
            TemporalState::Upcoming
        );
    }

    #[test]
    fn test_classify_by_time() {
        let banners = vec![
            banner("Expired", Some(now() - Duration::days(20)), Some(now() - Duration::seconds(1))),
            banner("Current", None, Some(now() + Duration::days(1))),
            banner("Next", Some(now() + Duration::hours(1)), Some(now() + Duration::days(1))),
            banner("Undated", None, None),
        ];

        let buckets = classify_by_time(&banners, now());

        assert_eq!(buckets.active.len(), 1);
        assert_eq!(buckets.active[0].display_name, "Current");
        assert_eq!(buckets.upcoming.len(), 1);
        assert_eq!(buckets.upcoming[0].display_name, "Next");
        assert_eq!(buckets.undated.len(), 1);
        assert_eq!(buckets.len(), 3);
        assert_eq!(
            buckets.iter().map(|b| b.display_name.as_str()).collect::<Vec<_>>(),
            vec!["Current", "Next", "Undated"]
        );
    }

    #[test]
    fn test_classify_empty() {
        let buckets = classify_by_time(&[], now());
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_temporal_state_serialization() {
        assert_eq!(
            serde_json::to_string(&TemporalState::Upcoming).unwrap(),
            "\"upcoming\""
        );
    }
}
