//! Duration text parsing.
//!
//! Banner durations are free text such as
//! `"2026/01/25 04:00 - 2026/02/16 03:59"` or
//! `"After 4.0 patch goes live - 2026/03/03 15:00"`. Dates are pulled out with
//! a pattern match and interpreted in the page's UTC offset.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, warn};

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})(?:\s+(\d{1,2}):(\d{2}))?").expect("invalid date regex")
});

/// Errors from strict duration parsing.
#[derive(Debug, Error)]
pub enum DurationError {
    #[error("Invalid date in duration text: {0}")]
    InvalidDate(String),

    #[error("Assumed start falls outside the representable range")]
    StartOutOfRange,
}

/// Parsed (start, end) bounds of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationSpan {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DurationSpan {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Default assumed age of a banner when only its end is published.
pub const DEFAULT_STALE_START_DAYS: i64 = 20;

/// Parses duration text into timestamps.
#[derive(Debug, Clone)]
pub struct DurationParser {
    /// Offset of the wall-clock times printed on the page
    offset: FixedOffset,

    /// Assumed age of a banner when only its end is published
    stale_start: Duration,
}

impl Default for DurationParser {
    fn default() -> Self {
        Self::new(
            FixedOffset::east_opt(0).expect("zero offset is valid"),
            DEFAULT_STALE_START_DAYS,
        )
    }
}

impl DurationParser {
    /// Falls back to the default stale start when `stale_start_days` does not
    /// fit in a `Duration`.
    pub fn new(offset: FixedOffset, stale_start_days: i64) -> Self {
        let stale_start = Duration::try_days(stale_start_days).unwrap_or_else(|| {
            warn!(
                "stale_start_days {} out of range, using {}",
                stale_start_days, DEFAULT_STALE_START_DAYS
            );
            Duration::days(DEFAULT_STALE_START_DAYS)
        });
        Self { offset, stale_start }
    }

    /// Build a parser from an hour offset, falling back to UTC when out of range.
    pub fn with_offset_hours(offset_hours: i32, stale_start_days: i64) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| {
            warn!("UTC offset {}h out of range, using UTC", offset_hours);
            FixedOffset::east_opt(0).expect("zero offset is valid")
        });
        Self::new(offset, stale_start_days)
    }

    /// Parse `text`, failing if any used date is not a real calendar date.
    ///
    /// Two or more dates give (start, end) from the first two. A single date
    /// is the end, with the start assumed `stale_start` before `now`. No
    /// dates gives an empty span.
    pub fn parse(&self, text: &str, now: DateTime<Utc>) -> Result<DurationSpan, DurationError> {
        let mut matches = DATE_PATTERN.captures_iter(text);

        let Some(first) = matches.next() else {
            debug!("No dates in duration text: {:?}", text);
            return Ok(DurationSpan::default());
        };
        let first = self.to_utc(&first)?;

        match matches.next() {
            Some(second) => {
                let second = self.to_utc(&second)?;
                Ok(DurationSpan {
                    start: Some(first),
                    end: Some(second),
                })
            }
            None => {
                let start = now
                    .checked_sub_signed(self.stale_start)
                    .ok_or(DurationError::StartOutOfRange)?;
                Ok(DurationSpan {
                    start: Some(start),
                    end: Some(first),
                })
            }
        }
    }

    /// Parse `text`, degrading to an empty span on any error.
    pub fn parse_lenient(&self, text: &str, now: DateTime<Utc>) -> DurationSpan {
        self.parse(text, now).unwrap_or_else(|e| {
            warn!("Could not parse duration {:?}: {}", text, e);
            DurationSpan::default()
        })
    }

    fn to_utc(&self, caps: &Captures<'_>) -> Result<DateTime<Utc>, DurationError> {
        let naive = naive_from_captures(caps)
            .ok_or_else(|| DurationError::InvalidDate(caps[0].to_string()))?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| DurationError::InvalidDate(caps[0].to_string()))
    }
}

/// Every date-like substring of `text`, in document order.
pub fn find_dates(text: &str) -> Vec<&str> {
    DATE_PATTERN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Parse one `YYYY/MM/DD[ HH:MM]` string as a naive wall-clock time.
pub fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATE_PATTERN
        .captures(text)
        .and_then(|caps| naive_from_captures(&caps))
}

fn naive_from_captures(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    let time = match (number(4), number(5)) {
        (Some(hour), Some(minute)) => NaiveTime::from_hms_opt(hour, minute, 0)?,
        _ => NaiveTime::MIN,
    };

    Some(date.and_time(time))
}
