use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, warn};

use sitepulse_core::{analytics::AnalyticsBackend, config::Config, site::SiteKey};
use sitepulse_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// The DuckDB backend, used directly for accounts and the site registry.
    pub db: Arc<DuckDbBackend>,

    /// The same backend behind the aggregation trait; analytics handlers only
    /// see this seam.
    pub analytics: Arc<dyn AnalyticsBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// MaxMind City database, when one is present at `config.geoip_path`.
    pub geoip: Option<Arc<maxminddb::Reader<Vec<u8>>>>,

    /// In-process cache of access key -> site.
    ///
    /// Populated lazily by the track endpoint. Entries are evicted when the
    /// site is deleted, so a stale key never authenticates.
    site_key_cache: Arc<RwLock<HashMap<String, SiteKey>>>,
}

impl AppState {
    /// Construct a new `AppState` wrapping the given backend and config.
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let geoip = open_geoip(&config.geoip_path);
        Self {
            analytics: db.clone(),
            db,
            config: Arc::new(config),
            geoip,
            site_key_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve a pixel access key to its site.
    ///
    /// Checks the cache first; on a miss falls back to DuckDB and caches the
    /// hit. Unknown keys are not cached.
    pub async fn resolve_access_key(&self, access_key: &str) -> Result<Option<SiteKey>> {
        {
            let cache = self.site_key_cache.read().await;
            if let Some(site) = cache.get(access_key) {
                return Ok(Some(site.clone()));
            }
        }

        let found = self.db.find_site_by_access_key(access_key).await?;
        if let Some(site) = &found {
            let mut cache = self.site_key_cache.write().await;
            cache.insert(access_key.to_string(), site.clone());
        }
        Ok(found)
    }

    pub async fn evict_access_key(&self, access_key: &str) {
        let mut cache = self.site_key_cache.write().await;
        cache.remove(access_key);
    }
}

/// Open the GeoIP database, or log and continue without one.
fn open_geoip(path: &str) -> Option<Arc<maxminddb::Reader<Vec<u8>>>> {
    if !std::path::Path::new(path).exists() {
        warn!(
            geoip_path = %path,
            "GeoIP database not found. Pageviews stored with NULL country/city. \
             Set SITEPULSE_GEOIP_PATH to a GeoLite2-City .mmdb file to enable."
        );
        return None;
    }
    match maxminddb::Reader::open_readfile(path) {
        Ok(reader) => {
            info!(geoip_path = %path, "GeoIP database loaded");
            Some(Arc::new(reader))
        }
        Err(e) => {
            warn!(geoip_path = %path, error = %e, "GeoIP database unreadable; geo lookups disabled");
            None
        }
    }
}
