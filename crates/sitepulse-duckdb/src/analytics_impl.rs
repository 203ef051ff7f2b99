use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sitepulse_core::analytics::{
    AnalyticsBackend, BreakdownRow, DailyPoint, Dimension, GeoRow, PeriodStats,
};
use sitepulse_core::event::PageviewEvent;
use sitepulse_core::range::DateRange;

use crate::DuckDbBackend;

#[async_trait]
impl AnalyticsBackend for DuckDbBackend {
    async fn insert_pageview(&self, event: &PageviewEvent) -> anyhow::Result<()> {
        DuckDbBackend::insert_pageview(self, event).await
    }

    async fn live_visitors(&self, site_id: &str, since: DateTime<Utc>) -> anyhow::Result<i64> {
        self.get_live_visitors(site_id, since).await
    }

    async fn period_stats(&self, site_id: &str, range: &DateRange) -> anyhow::Result<PeriodStats> {
        self.get_period_stats(site_id, range).await
    }

    async fn daily_visitors(
        &self,
        site_id: &str,
        range: &DateRange,
    ) -> anyhow::Result<Vec<DailyPoint>> {
        self.get_daily_visitors(site_id, range).await
    }

    async fn breakdown(
        &self,
        site_id: &str,
        range: &DateRange,
        dimension: Dimension,
    ) -> anyhow::Result<Vec<BreakdownRow>> {
        self.get_breakdown(site_id, range, dimension).await
    }

    async fn geo(&self, site_id: &str, range: &DateRange) -> anyhow::Result<Vec<GeoRow>> {
        self.get_geo(site_id, range).await
    }
}
