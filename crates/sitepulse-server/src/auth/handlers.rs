use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::AppState};

use super::jwt::encode_jwt;
use super::middleware::AuthUser;
use super::password::{hash_password, validate_password_strength, verify_password};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Trimmed, lowercased email plus the raw password; 400 when either is blank.
    fn into_parts(self) -> Result<(String, String), AppError> {
        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::BadRequest("password is required".to_string()))?;
        Ok((email, password))
    }
}

// ---------------------------------------------------------------------------
// POST /api/auth/signup
// ---------------------------------------------------------------------------

/// `POST /api/auth/signup`: Register an account. 201 with the new user.
#[tracing::instrument(skip(state, req))]
pub async fn auth_signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (email, password) = req.into_parts()?;
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is invalid".to_string()));
    }
    validate_password_strength(&password).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let hash = hash_password(&password, state.config.argon2_memory_kb)?;
    let user = state
        .db
        .create_user(&email, &hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("email is already registered".to_string()))?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok((StatusCode::CREATED, Json(json!({ "data": { "user": user } }))))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

/// `POST /api/auth/login`: Exchange credentials for a bearer token.
#[tracing::instrument(skip(state, req))]
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (email, password) = req.into_parts()?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
    let creds = state.db.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&password, &creds.password_hash) {
        return Err(invalid());
    }

    let jwt_secret = state.db.ensure_jwt_secret().await?;
    let (token, expires_at) = encode_jwt(
        &jwt_secret,
        &creds.user.id,
        &creds.user.email,
        state.config.session_days,
    )?;

    Ok(Json(json!({
        "data": {
            "token": token,
            "expires_at": expires_at,
            "user": creds.user,
        }
    })))
}

// ---------------------------------------------------------------------------
// GET /api/auth/me
// ---------------------------------------------------------------------------

/// `GET /api/auth/me`: The authenticated caller.
pub async fn auth_me(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "data": {
            "user": {
                "id": user.user_id,
                "email": user.email,
            }
        }
    }))
}
