use anyhow::Result;

use sitepulse_core::analytics::{into_breakdown, into_geo, BreakdownRow, Dimension, GeoRow};
use sitepulse_core::range::DateRange;

use crate::DuckDbBackend;

/// Column expression grouped on for each dimension. Blank strings fold into
/// NULL so they pick up the dimension's fallback label.
fn column_expr(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Referrer => "NULLIF(TRIM(referrer), '')",
        Dimension::Page => "NULLIF(TRIM(page_url), '')",
        Dimension::Device => "device_type",
        Dimension::Browser => "browser",
    }
}

impl DuckDbBackend {
    /// Frequency table of pageviews by `dimension`, sorted by count descending.
    pub async fn get_breakdown(
        &self,
        site_id: &str,
        range: &DateRange,
        dimension: Dimension,
    ) -> Result<Vec<BreakdownRow>> {
        let conn = self.conn.lock().await;

        // The column expression comes from a fixed enum, never user input.
        let sql = format!(
            "SELECT {} AS dim_value, COUNT(*) AS hits \
             FROM pageviews \
             WHERE site_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
             GROUP BY dim_value",
            column_expr(dimension)
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            duckdb::params![site_id, range.lower_bound(), range.upper_bound()],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut groups = Vec::new();
        for row in rows {
            let (value, hits) = row?;
            groups.push((dimension.label(value.as_deref()), hits));
        }

        Ok(into_breakdown(groups))
    }

    /// Pageviews grouped by `(country, city)`.
    pub async fn get_geo(&self, site_id: &str, range: &DateRange) -> Result<Vec<GeoRow>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT country, city, COUNT(*) AS hits \
             FROM pageviews \
             WHERE site_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
             GROUP BY country, city",
        )?;
        let rows = stmt.query_map(
            duckdb::params![site_id, range.lower_bound(), range.upper_bound()],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }

        Ok(into_geo(groups))
    }
}
