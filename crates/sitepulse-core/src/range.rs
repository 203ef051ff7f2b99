//! Date-range resolution for aggregation requests.

use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;

/// Window used when a request names neither `range` nor `from`/`to`.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Longest span an explicit `from`/`to` pair may cover, counting both ends.
pub const MAX_RANGE_DAYS: i64 = 3660;

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 9999;

/// Named range shorthand accepted as `?range=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    Week,
    Month,
    Quarter,
    Year,
}

impl RangePreset {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim() {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "365d" => Ok(Self::Year),
            other => Err(CoreError::InvalidRange(other.to_string())),
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }
}

/// An inclusive range of UTC calendar dates.
///
/// Both ends lie within years 1970..=9999 and the span is at most
/// [`MAX_RANGE_DAYS`], so neighbouring windows and bounds never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        for date in [start, end] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(CoreError::DateOutOfBounds(date.to_string()));
            }
        }
        if end < start {
            return Err(CoreError::InvertedRange);
        }
        let range = Self { start, end };
        if range.len_days() > MAX_RANGE_DAYS {
            return Err(CoreError::RangeTooLong(MAX_RANGE_DAYS));
        }
        Ok(range)
    }

    /// `[today - days, today]`, the window the dashboard presets select.
    pub fn trailing(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    /// Number of calendar days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The window of equal length ending the day before `start`.
    ///
    /// Saturates at the earliest representable date rather than overflowing.
    pub fn previous_period(&self) -> Self {
        let end = self.start.pred_opt().unwrap_or(self.start);
        let start = end
            .checked_sub_days(Days::new(self.len_days().unsigned_abs() - 1))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Every date in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).map(move |offset| start + Duration::days(offset))
    }

    /// Inclusive lower bound for `created_at`, formatted for SQL comparison.
    pub fn lower_bound(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Exclusive upper bound for `created_at`: midnight after `end`.
    pub fn upper_bound(&self) -> String {
        self.end
            .succ_opt()
            .unwrap_or(self.end)
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Resolve the query parameters of an aggregation request into a range.
///
/// An explicit `from`/`to` pair wins over `range`; a missing side of the pair
/// falls back to the default window. With neither present, `range` (default
/// `30d`) selects a trailing window ending `today`.
pub fn resolve_range(
    today: NaiveDate,
    from: Option<&str>,
    to: Option<&str>,
    range: Option<&str>,
) -> Result<DateRange, CoreError> {
    let from = from.map(str::trim).filter(|s| !s.is_empty());
    let to = to.map(str::trim).filter(|s| !s.is_empty());

    if from.is_none() && to.is_none() {
        let days = match range.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => RangePreset::parse(raw)?.days(),
            None => DEFAULT_RANGE_DAYS,
        };
        return Ok(DateRange::trailing(today, days));
    }

    let start = match from {
        Some(raw) => parse_date(raw)?,
        None => today - Duration::days(DEFAULT_RANGE_DAYS),
    };
    let end = match to {
        Some(raw) => parse_date(raw)?,
        None => today,
    };
    DateRange::new(start, end)
}

fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(CoreError::DateOutOfBounds(raw.to_string()));
    }
    Ok(date)
}
