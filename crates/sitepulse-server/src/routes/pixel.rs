use axum::{http::header, response::IntoResponse};

const PIXEL_JS: &str = include_str!("../../assets/pixel.js");

/// `GET /pixel.js`: the tracking script referenced by site snippets.
pub async fn pixel_js() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        PIXEL_JS,
    )
}
