use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use sitepulse_core::{
    analytics::{Dimension, Overview, LIVE_WINDOW_MINUTES},
    range::{resolve_range, DateRange},
};

use crate::{auth::middleware::AuthUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub range: Option<String>,
    /// Breakdown dimension: `device` (default) or `browser`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl AnalyticsQuery {
    fn date_range(&self) -> Result<DateRange, AppError> {
        let today = Utc::now().date_naive();
        Ok(resolve_range(
            today,
            self.from.as_deref(),
            self.to.as_deref(),
            self.range.as_deref(),
        )?)
    }
}

/// 404 unless `site_id` exists and belongs to the caller.
async fn ensure_owned(state: &AppState, site_id: &str, user: &AuthUser) -> Result<(), AppError> {
    state
        .db
        .get_site_for_user(site_id, &user.user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))
}

/// `GET /api/analytics/{site_id}/overview`: headline numbers, the previous
/// period, per-metric changes and the daily visitor series.
#[tracing::instrument(skip(state, user, query), fields(user_id = %user.user_id))]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = query.date_range()?;
    ensure_owned(&state, &site_id, &user).await?;

    let previous_range = range.previous_period();
    let since = Utc::now() - Duration::minutes(LIVE_WINDOW_MINUTES);
    let analytics = &state.analytics;

    let (live, current, previous, graph) = tokio::try_join!(
        analytics.live_visitors(&site_id, since),
        analytics.period_stats(&site_id, &range),
        analytics.period_stats(&site_id, &previous_range),
        analytics.daily_visitors(&site_id, &range),
    )?;

    let overview = Overview::assemble(live, range, current, previous, graph);
    Ok(Json(json!({ "data": overview })))
}

async fn frequency_table(
    state: &AppState,
    user: &AuthUser,
    site_id: &str,
    query: &AnalyticsQuery,
    dimension: Dimension,
) -> Result<Json<serde_json::Value>, AppError> {
    let range = query.date_range()?;
    ensure_owned(state, site_id, user).await?;

    let rows = state.analytics.breakdown(site_id, &range, dimension).await?;
    Ok(Json(json!({ "data": rows })))
}

/// `GET /api/analytics/{site_id}/referrals`: pageviews by referrer.
pub async fn referrals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    frequency_table(&state, &user, &site_id, &query, Dimension::Referrer).await
}

/// `GET /api/analytics/{site_id}/pages`: pageviews by path.
pub async fn pages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    frequency_table(&state, &user, &site_id, &query, Dimension::Page).await
}

/// `GET /api/analytics/{site_id}/breakdown?type=device|browser`
pub async fn breakdown(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let dimension = Dimension::parse_breakdown_type(query.kind.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    frequency_table(&state, &user, &site_id, &query, dimension).await
}

/// `GET /api/analytics/{site_id}/geo`: pageviews by country and city.
pub async fn geo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = query.date_range()?;
    ensure_owned(&state, &site_id, &user).await?;

    let rows = state.analytics.geo(&site_id, &range).await?;
    Ok(Json(json!({ "data": rows })))
}
