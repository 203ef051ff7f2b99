/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `SITEPULSE_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit: the DuckDB default of 80% of system RAM is not acceptable for a
/// server process.
///
/// There are no FOREIGN KEY declarations. DuckDB enforces them per statement,
/// which fights the child-first cascade in `delete_site`; referential
/// integrity is kept by the ingestion path resolving the site before writing.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret'  – HS256 signing secret for bearer tokens
--   'version'     – Database schema version
--   'install_id'  – Unique installation identifier
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- USERS
-- ===========================================
CREATE TABLE IF NOT EXISTS users (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    email           VARCHAR NOT NULL UNIQUE,       -- lowercased
    password_hash   VARCHAR NOT NULL,              -- Argon2id PHC string
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- SITES
-- ===========================================
CREATE TABLE IF NOT EXISTS sites (
    id              VARCHAR PRIMARY KEY,           -- 'site_' + 10 alphanumerics
    user_id         VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    access_key      VARCHAR NOT NULL UNIQUE,       -- 'pk_' + 32 hex
    goal_url        VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sites_user ON sites(user_id, created_at DESC);

-- ===========================================
-- PAGEVIEWS (append-only event log)
-- ===========================================
CREATE TABLE IF NOT EXISTS pageviews (
    id              VARCHAR NOT NULL,              -- UUID v4
    site_id         VARCHAR NOT NULL,
    visitor_hash    VARCHAR NOT NULL,              -- client-side pseudo-identifier
    session_id      VARCHAR NOT NULL,
    referrer        VARCHAR,
    user_agent      VARCHAR NOT NULL,

    -- Derived from user_agent at ingestion
    browser         VARCHAR,
    device_type     VARCHAR,                       -- 'desktop' | 'mobile' | 'tablet'

    -- GeoIP (NULL unless a GeoIP database is configured)
    country         VARCHAR(2),
    city            VARCHAR,

    page_url        VARCHAR NOT NULL,
    duration        INTEGER NOT NULL DEFAULT 0,    -- seconds
    is_goal         BOOLEAN NOT NULL DEFAULT false,
    created_at      TIMESTAMP NOT NULL
);

-- Primary query pattern: site + date range
CREATE INDEX IF NOT EXISTS idx_pageviews_site_time
    ON pageviews(site_id, created_at DESC);
"#
    )
}
