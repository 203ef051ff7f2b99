use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use sitepulse_core::event::{is_goal, PageviewEvent, TrackPayload};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub key: Option<String>,
}

/// `POST /api/track?key=<access_key>`: record one pageview.
///
/// ## Auth
/// The site's access key in the query string. Missing or unknown keys are
/// rejected with 401 before the body is looked at; nothing is written.
///
/// ## Enrichment
/// - `browser`, `device_type`: parsed from `User-Agent` via `woothee`.
/// - `country`, `city`: GeoIP via `maxminddb` on the first `X-Forwarded-For`
///   entry, NULL when no database is loaded.
/// - `is_goal`: `page_url` equals the site's goal URL.
///
/// ## Response
/// `204 No Content` once the row is stored.
#[tracing::instrument(skip_all)]
pub async fn track(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackQuery>,
    headers: HeaderMap,
    payload: Result<Json<TrackPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing API key".to_string()))?;

    let site = state
        .resolve_access_key(key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let track = payload
        .validate()
        .map_err(|field| AppError::BadRequest(format!("{field} is required")))?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let ua = parse_user_agent(&user_agent);

    let geo = match (&state.geoip, extract_client_ip(&headers)) {
        (Some(reader), Some(ip)) => lookup_geo(reader, ip),
        _ => None,
    };

    let event = PageviewEvent {
        id: uuid::Uuid::new_v4().to_string(),
        is_goal: is_goal(&track.page_url, site.goal_url.as_deref()),
        site_id: site.site_id,
        visitor_hash: track.visitor_hash,
        session_id: track.session_id,
        referrer: track.referrer,
        user_agent,
        browser: ua.as_ref().and_then(|u| u.browser.clone()),
        device_type: ua.as_ref().and_then(|u| u.device_type.map(str::to_string)),
        country: geo.as_ref().and_then(|g| g.country.clone()),
        city: geo.as_ref().and_then(|g| g.city.clone()),
        page_url: track.page_url,
        duration: track.duration,
        created_at: Utc::now(),
    };

    state.analytics.insert_pageview(&event).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The client IP from the first `X-Forwarded-For` entry.
fn extract_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
}

struct GeoInfo {
    country: Option<String>,
    city: Option<String>,
}

/// Look `ip` up in the MaxMind City database. Private and loopback addresses
/// are never in the database and are skipped.
fn lookup_geo(reader: &maxminddb::Reader<Vec<u8>>, ip: IpAddr) -> Option<GeoInfo> {
    let is_private = match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback(),
    };
    if is_private {
        return None;
    }

    let record = reader
        .lookup(ip)
        .ok()?
        .decode::<maxminddb::geoip2::City>()
        .ok()??;

    Some(GeoInfo {
        country: record.country.iso_code.map(str::to_string),
        city: record.city.names.english.map(str::to_string),
    })
}

/// Parsed User-Agent fields.
#[derive(Debug, PartialEq)]
struct UaInfo {
    browser: Option<String>,
    /// `desktop` | `mobile` | `tablet`.
    device_type: Option<&'static str>,
}

/// Parse a `User-Agent` string via the `woothee` crate.
///
/// Returns `None` for an empty header.
fn parse_user_agent(user_agent: &str) -> Option<UaInfo> {
    if user_agent.trim().is_empty() {
        return None;
    }

    let Some(result) = woothee::parser::Parser::new().parse(user_agent) else {
        return Some(UaInfo {
            browser: None,
            device_type: None,
        });
    };

    // woothee has no tablet category; iPads and Android tablets come back as
    // smartphones, so the raw string decides.
    let lowered = user_agent.to_ascii_lowercase();
    let is_tablet = lowered.contains("ipad")
        || lowered.contains("tablet")
        || (lowered.contains("android") && !lowered.contains("mobile"));

    let device_type = match result.category {
        "smartphone" | "mobilephone" if is_tablet => Some("tablet"),
        "smartphone" | "mobilephone" => Some("mobile"),
        "pc" => Some("desktop"),
        _ => None,
    };

    // woothee reports unknown values as "UNKNOWN".
    let browser = Some(result.name)
        .filter(|name| !name.is_empty() && *name != "UNKNOWN")
        .map(str::to_string);

    Some(UaInfo {
        browser,
        device_type,
    })
}
