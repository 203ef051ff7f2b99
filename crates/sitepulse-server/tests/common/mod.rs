//! Helpers shared by the HTTP integration tests. Each test binary pulls in
//! only what it needs, so unused items are expected per binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sitepulse_core::config::Config;
use sitepulse_duckdb::DuckDbBackend;
use sitepulse_server::app::build_app;
use sitepulse_server::state::AppState;

pub fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/sitepulse-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        geoip_path: "/nonexistent/GeoLite2-City.mmdb".to_string(),
        session_days: 7,
        argon2_memory_kb: 4096, // Low memory for fast tests.
        public_url: "http://localhost:3000".to_string(),
    }
}

/// Fresh in-memory app with the default test config.
pub async fn setup() -> (Arc<AppState>, axum::Router) {
    setup_with(test_config()).await
}

pub async fn setup_with(config: Config) -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, config));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

pub async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("build request")
}

/// Sign up and log in with password `secret1`; returns `(user_id, token)`.
pub async fn signup_and_login(app: &axum::Router, email: &str) -> (String, String) {
    let creds = json!({"email": email, "password": "secret1"});
    let response = app
        .clone()
        .oneshot(post_json("/api/auth/signup", &creds))
        .await
        .expect("signup");
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = json_body(response).await["data"]["user"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/login", &creds))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await["data"]["token"]
        .as_str()
        .expect("token")
        .to_string();
    (user_id, token)
}
