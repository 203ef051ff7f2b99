use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use sitepulse_core::site::Site;
use sitepulse_duckdb::site::CreateSiteParams;

use crate::{auth::middleware::AuthUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub domain: Option<String>,
    pub goal_url: Option<String>,
}

fn site_json(site: &Site, public_url: &str) -> serde_json::Value {
    json!({
        "id": site.id,
        "domain": site.domain,
        "access_key": site.access_key,
        "goal_url": site.goal_url,
        "tracking_snippet": site.tracking_snippet(public_url),
        "created_at": site.created_at,
    })
}

/// `POST /api/sites`: Register a site for the caller.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.user_id))]
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let domain = req
        .domain
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("domain is required".to_string()))?;
    let goal_url = req
        .goal_url
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());

    let site = state
        .db
        .create_site(CreateSiteParams {
            user_id: user.user_id,
            domain,
            goal_url,
        })
        .await?;

    tracing::info!(site_id = %site.id, "Site created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": site_json(&site, &state.config.public_url) })),
    ))
}

/// `GET /api/sites`: The caller's sites, newest first.
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let sites = state.db.list_sites(&user.user_id).await?;
    let data: Vec<_> = sites
        .iter()
        .map(|s| site_json(s, &state.config.public_url))
        .collect();
    Ok(Json(json!({ "data": data })))
}

/// `GET /api/sites/{site_id}`
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .get_site_for_user(&site_id, &user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
    Ok(Json(
        json!({ "data": site_json(&site, &state.config.public_url) }),
    ))
}

/// `DELETE /api/sites/{site_id}`: Delete a site and all its pageviews.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let access_key = state
        .db
        .delete_site(&site_id, &user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;

    state.evict_access_key(&access_key).await;
    Ok(StatusCode::NO_CONTENT)
}
