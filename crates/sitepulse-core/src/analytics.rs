//! Aggregate record types, the arithmetic shared by every backend, and the
//! analytics backend abstraction.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::PageviewEvent;
use crate::range::DateRange;

/// Trailing window for the live-visitor count.
pub const LIVE_WINDOW_MINUTES: i64 = 5;

/// Label for pageviews that arrived without a referrer.
pub const DIRECT_LABEL: &str = "Direct";

/// Label for rows whose dimension value is missing.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of `count` in `total` as a percentage, rounded to one decimal.
/// Zero when `total` is zero.
pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round1(count as f64 / total as f64 * 100.0)
}

/// Period-over-period change in percent, rounded to one decimal.
///
/// `None` when the previous value is zero: the change is undefined there.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some(round1((current - previous) / previous * 100.0))
}

/// Scalar aggregates for one site over one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodStats {
    pub unique_visitors: i64,
    pub sessions: i64,
    pub pageviews: i64,
    /// Mean of the per-pageview duration in seconds, one decimal.
    pub avg_duration: f64,
    pub goal_conversions: i64,
}

/// Percentage change of each scalar against the previous period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changes {
    pub unique_visitors: Option<f64>,
    pub sessions: Option<f64>,
    pub pageviews: Option<f64>,
    pub avg_duration: Option<f64>,
    pub goal_conversions: Option<f64>,
}

impl Changes {
    pub fn between(current: &PeriodStats, previous: &PeriodStats) -> Self {
        Self {
            unique_visitors: percent_change(
                current.unique_visitors as f64,
                previous.unique_visitors as f64,
            ),
            sessions: percent_change(current.sessions as f64, previous.sessions as f64),
            pageviews: percent_change(current.pageviews as f64, previous.pageviews as f64),
            avg_duration: percent_change(current.avg_duration, previous.avg_duration),
            goal_conversions: percent_change(
                current.goal_conversions as f64,
                previous.goal_conversions as f64,
            ),
        }
    }
}

/// Distinct visitors on one UTC calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub visitors: i64,
}

/// Expand sparse per-date visitor counts into one point per day of `range`.
pub fn zero_fill_daily(range: &DateRange, counts: &HashMap<String, i64>) -> Vec<DailyPoint> {
    range
        .days()
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            let visitors = counts.get(&date).copied().unwrap_or(0);
            DailyPoint { date, visitors }
        })
        .collect()
}

/// The dashboard overview card.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub live_visitors: i64,
    pub range: DateRange,
    #[serde(flatten)]
    pub current: PeriodStats,
    pub previous_range: DateRange,
    pub previous: PeriodStats,
    pub changes: Changes,
    pub graph: Vec<DailyPoint>,
}

impl Overview {
    pub fn assemble(
        live_visitors: i64,
        range: DateRange,
        current: PeriodStats,
        previous: PeriodStats,
        graph: Vec<DailyPoint>,
    ) -> Self {
        let changes = Changes::between(&current, &previous);
        Self {
            live_visitors,
            range,
            previous_range: range.previous_period(),
            current,
            previous,
            changes,
            graph,
        }
    }
}

/// Single-column dimensions that produce a frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Referrer,
    Page,
    Device,
    Browser,
}

impl Dimension {
    /// Parse the `type` parameter of the device/browser breakdown endpoint.
    /// Absent means `device`.
    pub fn parse_breakdown_type(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("device") => Ok(Self::Device),
            Some("browser") => Ok(Self::Browser),
            Some(_) => Err(anyhow!("type must be one of: device, browser")),
        }
    }

    /// Human-facing label for a raw stored value.
    pub fn label(self, raw: Option<&str>) -> String {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        match self {
            Self::Referrer => raw.unwrap_or(DIRECT_LABEL).to_string(),
            Self::Page => raw.unwrap_or("unknown").to_string(),
            Self::Device => match raw {
                Some("desktop") => "Desktop",
                Some("mobile") => "Mobile",
                Some("tablet") => "Tablet",
                _ => UNKNOWN_LABEL,
            }
            .to_string(),
            Self::Browser => raw.unwrap_or(UNKNOWN_LABEL).to_string(),
        }
    }
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub label: String,
    pub count: i64,
    pub percentage: f64,
}

/// Turn raw `(label, count)` groups into a frequency table.
///
/// Groups sharing a label after normalisation are merged. Rows are sorted by
/// count descending, ties by label ascending, so output is deterministic.
pub fn into_breakdown(groups: Vec<(String, i64)>) -> Vec<BreakdownRow> {
    let mut merged: HashMap<String, i64> = HashMap::new();
    for (label, count) in groups {
        *merged.entry(label).or_insert(0) += count;
    }
    let total: i64 = merged.values().sum();

    let mut rows: Vec<BreakdownRow> = merged
        .into_iter()
        .map(|(label, count)| BreakdownRow {
            percentage: percentage(count, total),
            label,
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// One row of the geographic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRow {
    pub country: String,
    pub city: Option<String>,
    pub count: i64,
    pub percentage: f64,
}

/// Turn raw `(country, city, count)` groups into the geographic table.
///
/// A missing country reports as `Unknown` with no city.
pub fn into_geo(groups: Vec<(Option<String>, Option<String>, i64)>) -> Vec<GeoRow> {
    let mut merged: HashMap<(String, Option<String>), i64> = HashMap::new();
    for (country, city, count) in groups {
        let key = match country.filter(|c| !c.trim().is_empty()) {
            Some(country) => (country, city.filter(|c| !c.trim().is_empty())),
            None => (UNKNOWN_LABEL.to_string(), None),
        };
        *merged.entry(key).or_insert(0) += count;
    }
    let total: i64 = merged.values().sum();

    let mut rows: Vec<GeoRow> = merged
        .into_iter()
        .map(|((country, city), count)| GeoRow {
            country,
            city,
            count,
            percentage: percentage(count, total),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.city.cmp(&b.city))
    });
    rows
}

/// Storage seam for ingestion and aggregation.
///
/// Every aggregation is scoped to one site and one inclusive date range.
#[async_trait::async_trait]
pub trait AnalyticsBackend: Send + Sync + 'static {
    async fn insert_pageview(&self, event: &PageviewEvent) -> Result<()>;

    /// Distinct visitors with a pageview at or after `since`.
    async fn live_visitors(&self, site_id: &str, since: DateTime<Utc>) -> Result<i64>;

    async fn period_stats(&self, site_id: &str, range: &DateRange) -> Result<PeriodStats>;

    /// Zero-filled distinct visitors per day.
    async fn daily_visitors(&self, site_id: &str, range: &DateRange) -> Result<Vec<DailyPoint>>;

    async fn breakdown(
        &self,
        site_id: &str,
        range: &DateRange,
        dimension: Dimension,
    ) -> Result<Vec<BreakdownRow>>;

    async fn geo(&self, site_id: &str, range: &DateRange) -> Result<Vec<GeoRow>>;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn referrer_breakdown_example() {
        let rows = into_breakdown(vec![
            ("x.com".to_string(), 1),
            ("Direct".to_string(), 2),
        ]);
        assert_eq!(
            rows,
            vec![
                BreakdownRow {
                    label: "Direct".to_string(),
                    count: 2,
                    percentage: 66.7
                },
                BreakdownRow {
                    label: "x.com".to_string(),
                    count: 1,
                    percentage: 33.3
                },
            ]
        );
    }

    #[test]
    fn breakdown_percentages_sum_to_hundred() {
        let rows = into_breakdown(vec![
            ("a".to_string(), 3),
            ("b".to_string(), 3),
            ("c".to_string(), 1),
            ("d".to_string(), 7),
            ("e".to_string(), 11),
        ]);
        let sum: f64 = rows.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.05 * rows.len() as f64, "sum was {sum}");
        // Equal counts fall back to label order.
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["e", "d", "a", "b", "c"]);
    }

    #[test]
    fn breakdown_merges_duplicate_labels() {
        let rows = into_breakdown(vec![
            ("Direct".to_string(), 1),
            ("Direct".to_string(), 4),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 5);
        assert_eq!(rows[0].percentage, 100.0);
    }

    #[test]
    fn empty_breakdown_is_empty() {
        assert!(into_breakdown(Vec::new()).is_empty());
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn change_is_undefined_when_previous_is_zero() {
        assert_eq!(percent_change(5.0, 0.0), None);
        assert_eq!(percent_change(0.0, 0.0), None);
        assert_eq!(percent_change(15.0, 10.0), Some(50.0));
        assert_eq!(percent_change(1.0, 3.0), Some(-66.7));
    }

    #[test]
    fn device_labels() {
        assert_eq!(Dimension::Device.label(Some("mobile")), "Mobile");
        assert_eq!(Dimension::Device.label(None), "Unknown");
        assert_eq!(Dimension::Referrer.label(Some("  ")), "Direct");
        assert_eq!(Dimension::Page.label(Some("/a")), "/a");
    }

    #[test]
    fn breakdown_type_parsing() {
        assert_eq!(Dimension::parse_breakdown_type(None).expect("ok"), Dimension::Device);
        assert_eq!(
            Dimension::parse_breakdown_type(Some("browser")).expect("ok"),
            Dimension::Browser
        );
        assert!(Dimension::parse_breakdown_type(Some("os")).is_err());
    }

    #[test]
    fn geo_unknown_country_drops_city() {
        let rows = into_geo(vec![
            (None, Some("Nowhere".to_string()), 2),
            (None, None, 1),
            (Some("DE".to_string()), Some("Berlin".to_string()), 1),
        ]);
        assert_eq!(rows[0].country, "Unknown");
        assert_eq!(rows[0].city, None);
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[0].percentage, 75.0);
        assert_eq!(rows[1].city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn zero_fill_covers_every_day() {
        let range = DateRange::new(date("2026-01-30"), date("2026-02-02")).expect("range");
        let mut counts = HashMap::new();
        counts.insert("2026-01-31".to_string(), 4);
        let series = zero_fill_daily(&range, &counts);
        let visitors: Vec<i64> = series.iter().map(|p| p.visitors).collect();
        assert_eq!(visitors, vec![0, 4, 0, 0]);
        assert_eq!(series[3].date, "2026-02-02");
    }

    #[test]
    fn overview_serializes_current_stats_flat() {
        let range = DateRange::new(date("2026-02-10"), date("2026-02-16")).expect("range");
        let current = PeriodStats {
            unique_visitors: 4,
            sessions: 5,
            pageviews: 9,
            avg_duration: 12.5,
            goal_conversions: 0,
        };
        let previous = PeriodStats {
            unique_visitors: 2,
            ..PeriodStats::default()
        };
        let overview = Overview::assemble(1, range, current, previous, Vec::new());
        assert_eq!(overview.changes.unique_visitors, Some(100.0));
        assert_eq!(overview.changes.sessions, None);

        let json = serde_json::to_value(&overview).expect("json");
        assert_eq!(json["unique_visitors"], 4);
        assert_eq!(json["previous"]["unique_visitors"], 2);
        assert!(json["changes"]["sessions"].is_null());
        assert_eq!(json["previous_range"]["end"], "2026-02-09");
    }
}
