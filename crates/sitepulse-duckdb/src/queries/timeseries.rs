use std::collections::HashMap;

use anyhow::Result;

use sitepulse_core::analytics::{zero_fill_daily, DailyPoint};
use sitepulse_core::range::DateRange;

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Distinct visitors per UTC calendar date, one point per day of `range`.
    pub async fn get_daily_visitors(
        &self,
        site_id: &str,
        range: &DateRange,
    ) -> Result<Vec<DailyPoint>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            r#"
            SELECT
                CAST(CAST(created_at AS DATE) AS VARCHAR) AS bucket,
                COUNT(DISTINCT visitor_hash) AS visitors
            FROM pageviews
            WHERE site_id = ?1
              AND created_at >= ?2
              AND created_at < ?3
            GROUP BY bucket
            "#,
        )?;

        let rows = stmt.query_map(
            duckdb::params![site_id, range.lower_bound(), range.upper_bound()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for row in rows {
            let (bucket, visitors) = row?;
            counts.insert(bucket, visitors);
        }

        Ok(zero_fill_daily(range, &counts))
    }
}
