use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::backend::sql_timestamp;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Distinct visitors with a pageview at or after `since`.
    ///
    /// Recomputed on every request; there is no push channel.
    pub async fn get_live_visitors(&self, site_id: &str, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().await;
        let live: i64 = conn
            .prepare(
                "SELECT COUNT(DISTINCT visitor_hash) FROM pageviews \
                 WHERE site_id = ?1 AND created_at >= ?2",
            )?
            .query_row(duckdb::params![site_id, sql_timestamp(&since)], |row| {
                row.get(0)
            })?;
        Ok(live)
    }
}
