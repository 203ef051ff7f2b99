#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub geoip_path: String,
    /// Lifetime of issued bearer tokens.
    pub session_days: u32,
    pub argon2_memory_kb: u32,
    /// Base URL the pixel snippet points at.
    pub public_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("SITEPULSE_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("SITEPULSE_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("SITEPULSE_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            geoip_path: std::env::var("SITEPULSE_GEOIP_PATH")
                .unwrap_or_else(|_| "./GeoLite2-City.mmdb".to_string()),
            session_days: std::env::var("SITEPULSE_SESSION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            argon2_memory_kb: std::env::var("SITEPULSE_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "19456".to_string())
                .parse()
                .unwrap_or(19456),
            public_url: std::env::var("SITEPULSE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}
