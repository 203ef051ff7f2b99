use anyhow::Result;

use sitepulse_core::site::{Site, SiteKey};

use crate::backend::rand_hex;
use crate::DuckDbBackend;

pub struct CreateSiteParams {
    pub user_id: String,
    pub domain: String,
    pub goal_url: Option<String>,
}

const SITE_COLUMNS: &str =
    "id, user_id, domain, access_key, goal_url, CAST(created_at AS VARCHAR)";

/// Generate a site ID: "site_" + 10 random alphanumeric chars.
fn generate_site_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("site_{}", chars)
}

/// Generate a pixel access key: "pk_" + 32 hex chars.
fn generate_access_key() -> String {
    format!("pk_{}", rand_hex(16))
}

fn site_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        user_id: row.get(1)?,
        domain: row.get(2)?,
        access_key: row.get(3)?,
        goal_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl DuckDbBackend {
    pub async fn create_site(&self, params: CreateSiteParams) -> Result<Site> {
        let conn = self.conn.lock().await;
        let id = generate_site_id();
        let access_key = generate_access_key();

        conn.execute(
            "INSERT INTO sites (id, user_id, domain, access_key, goal_url, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            duckdb::params![id, params.user_id, params.domain, access_key, params.goal_url],
        )?;

        // Read back the created row to get the timestamp.
        let site = conn
            .prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?
            .query_row(duckdb::params![id], site_from_row)?;

        Ok(site)
    }

    /// Sites owned by `user_id`, newest first.
    pub async fn list_sites(&self, user_id: &str) -> Result<Vec<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(duckdb::params![user_id], site_from_row)?;

        let mut sites = Vec::new();
        for row in rows {
            sites.push(row?);
        }
        Ok(sites)
    }

    /// Fetch a site only if `user_id` owns it.
    pub async fn get_site_for_user(&self, site_id: &str, user_id: &str) -> Result<Option<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1 AND user_id = ?2"
        ))?;
        let mut rows = stmt.query_map(duckdb::params![site_id, user_id], site_from_row)?;
        let site = rows.next().transpose()?;
        Ok(site)
    }

    /// Resolve a pixel access key to the site it authenticates.
    pub async fn find_site_by_access_key(&self, access_key: &str) -> Result<Option<SiteKey>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, goal_url FROM sites WHERE access_key = ?1")?;
        let mut rows = stmt.query_map(duckdb::params![access_key], |row| {
            Ok(SiteKey {
                site_id: row.get(0)?,
                goal_url: row.get(1)?,
            })
        })?;
        let key = rows.next().transpose()?;
        Ok(key)
    }

    /// Delete a site owned by `user_id` together with its pageviews.
    ///
    /// Returns the deleted site's access key so callers can evict caches, or
    /// `None` if no such site is owned by the user. Children go first, inside
    /// one transaction.
    pub async fn delete_site(&self, site_id: &str, user_id: &str) -> Result<Option<String>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let access_key: Option<String> = {
            let mut stmt =
                tx.prepare("SELECT access_key FROM sites WHERE id = ?1 AND user_id = ?2")?;
            let mut rows = stmt.query_map(duckdb::params![site_id, user_id], |row| row.get(0))?;
            let key = rows.next().transpose()?;
            key
        };
        let Some(access_key) = access_key else {
            return Ok(None);
        };

        tx.execute(
            "DELETE FROM pageviews WHERE site_id = ?1",
            duckdb::params![site_id],
        )?;
        tx.execute("DELETE FROM sites WHERE id = ?1", duckdb::params![site_id])?;
        tx.commit()?;

        tracing::info!(site_id, "Site deleted with its pageviews");
        Ok(Some(access_key))
    }
}
