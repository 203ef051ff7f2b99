use anyhow::Result;

use sitepulse_core::analytics::{round1, PeriodStats};
use sitepulse_core::range::DateRange;

use crate::DuckDbBackend;

impl DuckDbBackend {
    pub async fn get_period_stats(&self, site_id: &str, range: &DateRange) -> Result<PeriodStats> {
        let conn = self.conn.lock().await;

        // Visitors and sessions are cardinalities of distinct identifiers, never
        // row counts; an empty range yields zeros rather than NULLs.
        let mut stmt = conn.prepare(
            r#"
            SELECT
                COUNT(DISTINCT visitor_hash) AS unique_visitors,
                COUNT(DISTINCT session_id) AS sessions,
                COUNT(*) AS pageviews,
                COALESCE(AVG(CAST(duration AS DOUBLE)), 0.0) AS avg_duration,
                COUNT(*) FILTER (WHERE is_goal) AS goal_conversions
            FROM pageviews
            WHERE site_id = ?1
              AND created_at >= ?2
              AND created_at < ?3
            "#,
        )?;

        let stats = stmt.query_row(
            duckdb::params![site_id, range.lower_bound(), range.upper_bound()],
            |row| {
                Ok(PeriodStats {
                    unique_visitors: row.get(0)?,
                    sessions: row.get(1)?,
                    pageviews: row.get(2)?,
                    avg_duration: round1(row.get::<_, f64>(3)?),
                    goal_conversions: row.get(4)?,
                })
            },
        )?;

        Ok(stats)
    }
}
