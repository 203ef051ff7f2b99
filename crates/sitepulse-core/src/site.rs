use serde::Serialize;

/// A tracked property owned by one user account.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub id: String,
    pub user_id: String,
    pub domain: String,
    /// Authenticates the pixel at `POST /api/track?key=`.
    pub access_key: String,
    pub goal_url: Option<String>,
    pub created_at: String,
}

/// The subset of a site the ingestion path needs, cached per access key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteKey {
    pub site_id: String,
    pub goal_url: Option<String>,
}

impl Site {
    /// HTML snippet that embeds the tracking pixel for this site.
    pub fn tracking_snippet(&self, public_url: &str) -> String {
        format!(
            r#"<script defer src="{}/pixel.js" data-key="{}" data-endpoint="{}/api/track"></script>"#,
            public_url.trim_end_matches('/'),
            self.access_key,
            public_url.trim_end_matches('/'),
        )
    }
}
