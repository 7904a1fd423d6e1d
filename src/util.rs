//! Date/time utilities for normalizing carrier-provided timestamps.
//!
//! FedEx hands back dates in more than one shape:
//!   - **Timestamps**: ISO 8601 with an offset, e.g. `2024-01-08T10:15:00-06:00`
//!   - **Short dates**: `M/D/YY` or `M/D/YYYY`, e.g. `1/8/24`
//!
//! Everything is reduced to a naive `NaiveDateTime`. Offsets are stripped,
//! not applied: the wall-clock time the carrier reported is the time we use.
//! Anything that does not parse becomes `None`, and every metric downstream
//! treats `None` as "unknown" rather than failing.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use regex::Regex;
use std::sync::LazyLock;

static OFFSET_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Z|[+-]\d{2}(:?\d{2})?)$").expect("invalid offset regex"));

const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const SECONDS_PER_DAY: i64 = 86_400;

/// Years a carrier date may carry. Anything outside is treated as garbage.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

fn in_year_range(date: NaiveDateTime) -> Option<NaiveDateTime> {
    YEAR_RANGE.contains(&date.year()).then_some(date)
}

/// Parse a carrier date into a canonical timestamp.
///
/// Returns `None` for absent, empty, or unrecognised input. Never panics.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') {
        return parse_iso(raw);
    }

    parse_slash_date(raw)
}

fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    let (date, time) = raw.split_once('T')?;
    let time = OFFSET_SUFFIX.replace(time, "");
    let naive = format!("{date}T{time}");

    ISO_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&naive, fmt).ok())
        .and_then(in_year_range)
}

fn parse_slash_date(raw: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = raw.split('/').collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };

    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    let year = if year < 100 { year + 2000 } else { year };

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .and_then(in_year_range)
}

/// Whole days from `earlier` to `later`, rounded down.
///
/// A span of 6 days and 23 hours counts as 6; a negative span of half a day
/// counts as -1.
pub fn days_between(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    (later - earlier).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Count weekdays from the day after `start` through `end`, inclusive.
///
/// Either endpoint missing yields 0. Time of day is kept, so a step only
/// counts once `start + n days` has actually been reached by `end`.
pub fn working_days(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> i64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0;
    };

    let step = TimeDelta::days(1);
    let mut days = 0;
    let mut current = start.checked_add_signed(step);
    while let Some(day) = current.filter(|day| *day <= end) {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days += 1;
        }
        current = day.checked_add_signed(step);
    }
    days
}
