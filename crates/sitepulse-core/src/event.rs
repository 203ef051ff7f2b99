use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on a single pageview's recorded duration, in seconds.
pub const MAX_DURATION_SECS: i64 = 86_400;

/// The JSON body the tracking pixel sends to `POST /api/track`.
///
/// Every field is optional at the wire level so that a missing field surfaces
/// as a validation error with a JSON body rather than an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackPayload {
    pub visitor_hash: Option<String>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    pub page_url: Option<String>,
    /// Seconds spent on the page. The pixel sends `0` on load and the elapsed
    /// time when the page is hidden.
    pub duration: Option<i64>,
}

/// A validated payload with all required fields present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTrack {
    pub visitor_hash: String,
    pub session_id: String,
    pub referrer: Option<String>,
    pub page_url: String,
    pub duration: i64,
}

impl TrackPayload {
    /// Check required fields. Returns the name of the first missing field on
    /// failure so the caller can report it.
    pub fn validate(self) -> Result<ValidTrack, &'static str> {
        let visitor_hash = required(self.visitor_hash).ok_or("visitor_hash")?;
        let session_id = required(self.session_id).ok_or("session_id")?;
        let page_url = required(self.page_url).ok_or("page_url")?;
        Ok(ValidTrack {
            visitor_hash,
            session_id,
            referrer: self.referrer.and_then(|r| required(Some(r))),
            page_url,
            duration: self.duration.unwrap_or(0).clamp(0, MAX_DURATION_SECS),
        })
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The stored pageview row. Mirrors the DuckDB `pageviews` table columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageviewEvent {
    pub id: String,
    pub site_id: String,
    pub visitor_hash: String,
    pub session_id: String,
    pub referrer: Option<String>,
    pub user_agent: String,
    pub browser: Option<String>,
    /// `desktop` | `mobile` | `tablet`.
    pub device_type: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub page_url: String,
    pub duration: i64,
    pub is_goal: bool,
    pub created_at: DateTime<Utc>,
}

/// A pageview counts as a goal conversion when its path equals the site's
/// configured goal URL exactly.
pub fn is_goal(page_url: &str, goal_url: Option<&str>) -> bool {
    goal_url.is_some_and(|goal| goal == page_url)
}
