use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use sitepulse_core::event::PageviewEvent;

use crate::schema::init_sql;

/// Generate a cryptographically random hex string of `n` bytes (2n hex chars).
pub(crate) fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Format a timestamp the way it is stored in and compared against
/// `TIMESTAMP` columns.
pub(crate) fn sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// The DuckDB event store.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection lives in `Arc<Mutex<_>>` so every query
/// takes the lock for the duration of its statements while the struct stays
/// cheap to share across Axum handlers.
///
/// Memory and thread limits are enforced by [`init_sql`] at open time.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        Self::seed_settings_sync(&conn)?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only: data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Self::seed_settings_sync(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Seed `version` and `install_id` on a fresh database.
    ///
    /// `INSERT OR IGNORE` keeps re-runs on every startup harmless.
    fn seed_settings_sync(conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('version', ?1)",
            duckdb::params!["1"],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('install_id', ?1)",
            duckdb::params![rand_hex(8)],
        )?;
        Ok(())
    }

    /// Append one pageview to the event log.
    ///
    /// The caller has already resolved `site_id` from a valid access key.
    pub async fn insert_pageview(&self, event: &PageviewEvent) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO pageviews (
                id, site_id, visitor_hash, session_id,
                referrer, user_agent, browser, device_type,
                country, city,
                page_url, duration, is_goal, created_at
            ) VALUES (
                ?1,  ?2,  ?3,  ?4,
                ?5,  ?6,  ?7,  ?8,
                ?9,  ?10,
                ?11, ?12, ?13, ?14
            )"#,
            duckdb::params![
                event.id,
                event.site_id,
                event.visitor_hash,
                event.session_id,
                event.referrer,
                event.user_agent,
                event.browser,
                event.device_type,
                event.country,
                event.city,
                event.page_url,
                event.duration,
                event.is_goal,
                sql_timestamp(&event.created_at),
            ],
        )?;
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code should use the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
