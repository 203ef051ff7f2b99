use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

use super::jwt::decode_jwt;

/// The authenticated caller, injected into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// Require `Authorization: Bearer <jwt>` naming an existing user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return AppError::Unauthorized("Missing bearer token".to_string()).into_response();
    };

    match authenticate(&state, &token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => AppError::Unauthorized("Invalid or expired token".to_string()).into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

async fn authenticate(state: &AppState, token: &str) -> anyhow::Result<Option<AuthUser>> {
    let secret = state.db.ensure_jwt_secret().await?;
    let Ok(claims) = decode_jwt(token, &secret) else {
        return Ok(None);
    };
    // Tokens outlive deleted accounts; the user row is the source of truth.
    let user = state.db.get_user(&claims.sub).await?;
    Ok(user.map(|u| AuthUser {
        user_id: u.id,
        email: u.email,
    }))
}
