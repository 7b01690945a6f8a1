//! Time types and iCalendar date-time parsing.
//!
//! This module provides [`TimeRange`] for bounding queries, [`ZoneHint`] for
//! resolving floating times, and the parsers for `DATE`, `DATE-TIME` and
//! `DURATION` values.

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::Prop;

/// Errors from building time values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The range ends before it starts.
    #[error("time range start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The value is not a DATE or DATE-TIME.
    #[error("invalid date-time value {0:?}")]
    InvalidDateTime(String),

    /// The local time does not exist in the target zone (DST gap).
    #[error("local time {0} does not exist in zone {1}")]
    NonexistentLocalTime(NaiveDateTime, String),

    /// The value is not an RFC 5545 DURATION, or does not fit a duration.
    #[error("invalid duration value {0:?}")]
    InvalidDuration(String),

    /// An instant moved past the representable calendar.
    #[error("date-time out of range")]
    OutOfRange,
}

/// A half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidRange`] if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeError> {
        if start > end {
            return Err(TimeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range reaching `behind` into the past and `ahead` into the
    /// future of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] if either bound leaves the
    /// representable calendar.
    pub fn around(
        now: DateTime<Utc>,
        behind: Duration,
        ahead: Duration,
    ) -> Result<Self, TimeError> {
        let start = now
            .checked_sub_signed(behind.abs())
            .ok_or(TimeError::OutOfRange)?;
        let end = now
            .checked_add_signed(ahead.abs())
            .ok_or(TimeError::OutOfRange)?;
        Ok(Self { start, end })
    }

    /// Returns the duration of this range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if an instant falls within this range.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if an occurrence overlaps this range.
    ///
    /// A zero-length occurrence (`start == end`) overlaps when the instant
    /// lies inside the range; otherwise the occurrence must start before
    /// the range ends and end after it starts.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.contains(start);
        }
        start < self.end && end > self.start
    }
}

/// The zone used for floating times and unresolvable `TZID`s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZoneHint {
    /// The host's local zone.
    #[default]
    Local,
    /// UTC.
    Utc,
    /// A named IANA zone.
    Named(Tz),
}

impl ZoneHint {
    /// Parses `"local"`, `"utc"` or an IANA zone name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("local") => Some(Self::Local),
            s if s.eq_ignore_ascii_case("utc") => Some(Self::Utc),
            s => s.parse::<Tz>().ok().map(Self::Named),
        }
    }

    fn resolve(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
        match self {
            Self::Local => pick(Local.from_local_datetime(&naive), naive, "local"),
            Self::Utc => Ok(Utc.from_utc_datetime(&naive)),
            Self::Named(tz) => pick(tz.from_local_datetime(&naive), naive, tz.name()),
        }
    }
}

/// Picks the earliest mapping for ambiguous local times; fails in DST gaps.
fn pick<T: TimeZone>(
    result: LocalResult<DateTime<T>>,
    naive: NaiveDateTime,
    zone: &str,
) -> Result<DateTime<Utc>, TimeError> {
    match result {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
        LocalResult::None => Err(TimeError::NonexistentLocalTime(naive, zone.to_string())),
    }
}

/// Parses a `DATE` or `DATE-TIME` property into a UTC instant.
///
/// Handles:
/// - `20240110T100000Z` (UTC)
/// - `20240110T100000` with a `TZID` parameter
/// - `20240110T100000` floating, resolved in `fallback`
/// - `20240110` (date only), midnight in `fallback`
///
/// A `TZID` that `chrono-tz` does not know is resolved in `fallback` too.
pub fn parse_date_time(prop: &Prop, fallback: ZoneHint) -> Result<DateTime<Utc>, TimeError> {
    let value = prop.value.trim();
    let invalid = || TimeError::InvalidDateTime(prop.value.clone());

    if prop.param("VALUE") == Some("DATE") || (value.len() == 8 && !value.contains('T')) {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid())?;
        return fallback.resolve(date.and_time(NaiveTime::MIN));
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    let zone = prop
        .param("TZID")
        .and_then(|tzid| tzid.trim_start_matches('/').parse::<Tz>().ok())
        .map(ZoneHint::Named)
        .unwrap_or(fallback);
    zone.resolve(naive)
}

/// Parses an RFC 5545 `DURATION` value such as `PT1H30M`, `-PT58M` or `P1W`.
pub fn parse_duration(value: &str) -> Result<Duration, TimeError> {
    let invalid = || TimeError::InvalidDuration(value.to_string());
    let s = value.trim();

    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let s = s.strip_prefix('P').ok_or_else(invalid)?;
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::zero();
    let mut in_time = false;
    let mut digits = String::new();
    let mut seen_unit = false;

    for c in s.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if !in_time && digits.is_empty() => in_time = true,
            unit => {
                let n: i64 = digits.parse().map_err(|_| invalid())?;
                digits.clear();
                let part = match (in_time, unit) {
                    (false, 'W') => Duration::try_weeks(n),
                    (false, 'D') => Duration::try_days(n),
                    (true, 'H') => Duration::try_hours(n),
                    (true, 'M') => Duration::try_minutes(n),
                    (true, 'S') => Duration::try_seconds(n),
                    _ => return Err(invalid()),
                };
                total = part
                    .and_then(|part| total.checked_add(&part))
                    .ok_or_else(invalid)?;
                seen_unit = true;
            }
        }
    }
    if !digits.is_empty() || !seen_unit {
        return Err(invalid());
    }

    Ok(if negative { -total } else { total })
}

/// Adds a parsed duration to `start`, failing past the representable calendar.
pub fn offset(start: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, TimeError> {
    start
        .checked_add_signed(duration)
        .ok_or(TimeError::OutOfRange)
}

/// Formats an instant as an iCalendar UTC `DATE-TIME` (`20240110T100000Z`).
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Formats a duration as an RFC 5545 `DURATION`, e.g. `-PT58M`.
pub fn format_duration(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { "-" } else { "" };
    let mut secs = duration.num_seconds().abs();
    if secs == 0 {
        return "PT0S".to_string();
    }

    let days = secs / 86_400;
    secs %= 86_400;
    let mut out = format!("{sign}P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if secs > 0 {
        out.push('T');
        let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
        if h > 0 {
            out.push_str(&format!("{h}H"));
        }
        if m > 0 {
            out.push_str(&format!("{m}M"));
        }
        if s > 0 {
            out.push_str(&format!("{s}S"));
        }
    }
    out
}
