use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{handlers, middleware::require_auth},
    routes,
    state::AppState,
};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Public routes: health, the pixel script, ingestion, signup and login.
/// Everything else sits behind [`require_auth`].
///
/// Outer layers, outermost first:
///
/// 1. `TraceLayer`: structured request/response logging via `tracing`.
/// 2. `CorsLayer`: permissive CORS; the pixel posts from third-party origins.
/// 3. `CompressionLayer`: gzip for the JSON aggregation payloads.
pub fn build_app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth_me))
        .route(
            "/api/sites",
            get(routes::sites::list_sites).post(routes::sites::create_site),
        )
        .route(
            "/api/sites/{site_id}",
            get(routes::sites::get_site).delete(routes::sites::delete_site),
        )
        .route(
            "/api/analytics/{site_id}/overview",
            get(routes::analytics::overview),
        )
        .route(
            "/api/analytics/{site_id}/referrals",
            get(routes::analytics::referrals),
        )
        .route("/api/analytics/{site_id}/pages", get(routes::analytics::pages))
        .route("/api/analytics/{site_id}/geo", get(routes::analytics::geo))
        .route(
            "/api/analytics/{site_id}/breakdown",
            get(routes::analytics::breakdown),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/pixel.js", get(routes::pixel::pixel_js))
        .route("/api/track", post(routes::track::track))
        .route("/api/auth/signup", post(handlers::auth_signup))
        .route("/api/auth/login", post(handlers::auth_login))
        .merge(protected)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
