mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tower::ServiceExt;

use sitepulse_core::event::PageviewEvent;
use sitepulse_duckdb::site::CreateSiteParams;
use sitepulse_server::state::AppState;

use common::{get_with_token, json_body, signup_and_login};

struct Fixture {
    state: Arc<AppState>,
    app: axum::Router,
    token: String,
    site_id: String,
}

/// Sign up over HTTP, log in, and create one site owned by that account.
async fn setup() -> Fixture {
    let (state, app) = common::setup().await;
    let (user_id, token) = signup_and_login(&app, "owner@example.com").await;

    let site = state
        .db
        .create_site(CreateSiteParams {
            user_id,
            domain: "example.com".to_string(),
            goal_url: Some("/thanks".to_string()),
        })
        .await
        .expect("site");

    Fixture {
        state,
        app,
        token,
        site_id: site.id,
    }
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0).expect("valid time").and_utc()
}

async fn insert(
    state: &AppState,
    site_id: &str,
    visitor: &str,
    created_at: DateTime<Utc>,
    edit: impl FnOnce(&mut PageviewEvent),
) {
    let mut event = PageviewEvent {
        id: uuid::Uuid::new_v4().to_string(),
        site_id: site_id.to_string(),
        visitor_hash: visitor.to_string(),
        session_id: format!("{visitor}-session"),
        referrer: None,
        user_agent: "test".to_string(),
        browser: Some("Chrome".to_string()),
        device_type: Some("desktop".to_string()),
        country: None,
        city: None,
        page_url: "/".to_string(),
        duration: 0,
        is_goal: false,
        created_at,
    };
    edit(&mut event);
    state.db.insert_pageview(&event).await.expect("insert");
}

#[tokio::test]
async fn test_overview_counts_and_average() {
    let fx = setup().await;
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date");

    insert(&fx.state, &fx.site_id, "A", at(day, 9), |e| e.duration = 10).await;
    insert(&fx.state, &fx.site_id, "A", at(day, 10), |e| e.duration = 20).await;
    insert(&fx.state, &fx.site_id, "B", at(day, 11), |e| {
        e.duration = 30;
        e.page_url = "/thanks".to_string();
        e.is_goal = true;
    })
    .await;

    let uri = format!(
        "/api/analytics/{}/overview?from=2024-06-10&to=2024-06-12",
        fx.site_id
    );
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let data = &json["data"];
    assert_eq!(data["unique_visitors"], 2);
    assert_eq!(data["sessions"], 2);
    assert_eq!(data["pageviews"], 3);
    assert_eq!(data["avg_duration"], 20.0);
    assert_eq!(data["goal_conversions"], 1);
    assert_eq!(data["range"]["start"], "2024-06-10");
    assert_eq!(data["previous_range"]["start"], "2024-06-07");
    assert_eq!(data["previous_range"]["end"], "2024-06-09");
    // Nothing in the previous window: changes are undefined, not errors.
    assert!(data["changes"]["unique_visitors"].is_null());

    let graph = data["graph"].as_array().expect("graph");
    assert_eq!(graph.len(), 3);
    assert_eq!(graph[0]["date"], "2024-06-10");
    assert_eq!(graph[0]["visitors"], 2);
    assert_eq!(graph[1]["visitors"], 0);
}

#[tokio::test]
async fn test_overview_period_over_period_change() {
    let fx = setup().await;
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date");

    // Previous day: one visitor. Current day: two.
    insert(&fx.state, &fx.site_id, "A", at(day - Duration::days(1), 12), |_| {}).await;
    insert(&fx.state, &fx.site_id, "A", at(day, 12), |_| {}).await;
    insert(&fx.state, &fx.site_id, "B", at(day, 13), |_| {}).await;

    let uri = format!(
        "/api/analytics/{}/overview?from=2024-06-10&to=2024-06-10",
        fx.site_id
    );
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    let json = json_body(response).await;
    let data = &json["data"];
    assert_eq!(data["previous"]["unique_visitors"], 1);
    assert_eq!(data["changes"]["unique_visitors"], 100.0);
}

#[tokio::test]
async fn test_overview_live_visitors() {
    let fx = setup().await;
    let now = Utc::now();
    insert(&fx.state, &fx.site_id, "A", now - Duration::minutes(1), |_| {}).await;
    insert(&fx.state, &fx.site_id, "B", now - Duration::minutes(20), |_| {}).await;

    let uri = format!("/api/analytics/{}/overview", fx.site_id);
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["live_visitors"], 1);
    // Default window is 30d: [today - 30, today].
    assert_eq!(json["data"]["graph"].as_array().map(Vec::len), Some(31));
}

#[tokio::test]
async fn test_referrals_percentages() {
    let fx = setup().await;
    let day = Utc::now().date_naive();

    insert(&fx.state, &fx.site_id, "A", at(day, 0), |_| {}).await;
    insert(&fx.state, &fx.site_id, "B", at(day, 0), |_| {}).await;
    insert(&fx.state, &fx.site_id, "C", at(day, 0), |e| {
        e.referrer = Some("x.com".to_string())
    })
    .await;

    let uri = format!("/api/analytics/{}/referrals?range=7d", fx.site_id);
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let rows = json["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], "Direct");
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(rows[0]["percentage"], 66.7);
    assert_eq!(rows[1]["label"], "x.com");
    assert_eq!(rows[1]["percentage"], 33.3);
}

#[tokio::test]
async fn test_pages_and_geo() {
    let fx = setup().await;
    let day = Utc::now().date_naive();

    insert(&fx.state, &fx.site_id, "A", at(day, 0), |e| {
        e.page_url = "/pricing".to_string();
        e.country = Some("DE".to_string());
        e.city = Some("Berlin".to_string());
    })
    .await;
    insert(&fx.state, &fx.site_id, "B", at(day, 0), |e| {
        e.page_url = "/pricing".to_string()
    })
    .await;
    insert(&fx.state, &fx.site_id, "C", at(day, 0), |_| {}).await;

    let uri = format!("/api/analytics/{}/pages?range=7d", fx.site_id);
    let response = fx
        .app
        .clone()
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    let json = json_body(response).await;
    assert_eq!(json["data"][0]["label"], "/pricing");
    assert_eq!(json["data"][0]["count"], 2);

    let uri = format!("/api/analytics/{}/geo?range=7d", fx.site_id);
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    let json = json_body(response).await;
    let rows = json["data"].as_array().expect("rows");
    assert_eq!(rows[0]["country"], "Unknown");
    assert_eq!(rows[0]["count"], 2);
    assert!(rows[0]["city"].is_null());
    assert_eq!(rows[1]["country"], "DE");
    assert_eq!(rows[1]["city"], "Berlin");
}

#[tokio::test]
async fn test_breakdown_device_and_browser() {
    let fx = setup().await;
    let day = Utc::now().date_naive();

    insert(&fx.state, &fx.site_id, "A", at(day, 0), |e| {
        e.device_type = Some("mobile".to_string());
        e.browser = Some("Safari".to_string());
    })
    .await;
    insert(&fx.state, &fx.site_id, "B", at(day, 0), |_| {}).await;

    let uri = format!("/api/analytics/{}/breakdown?range=7d", fx.site_id);
    let response = fx
        .app
        .clone()
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    let json = json_body(response).await;
    let labels: Vec<&str> = json["data"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|r| r["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["Desktop", "Mobile"]);

    let uri = format!("/api/analytics/{}/breakdown?range=7d&type=browser", fx.site_id);
    let response = fx
        .app
        .clone()
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    let json = json_body(response).await;
    let labels: Vec<&str> = json["data"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|r| r["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["Chrome", "Safari"]);

    let uri = format!("/api/analytics/{}/breakdown?type=os", fx.site_id);
    let response = fx
        .app
        .oneshot(get_with_token(&uri, &fx.token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_range_parameters_return_400() {
    let fx = setup().await;

    for query in [
        "range=14d",
        "from=2024-13-01",
        "from=2024-06-10&to=2024-06-01",
        "from=-262143-01-01&to=-262143-01-01",
        "from=2024-06-01&to=%2B262142-12-31",
        "from=0001-01-01&to=9999-12-31",
        "from=1970-01-01&to=9999-12-31",
    ] {
        let uri = format!("/api/analytics/{}/overview?{query}", fx.site_id);
        let response = fx
            .app
            .clone()
            .oneshot(get_with_token(&uri, &fx.token))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {query}");
    }
}

#[tokio::test]
async fn test_foreign_site_returns_404() {
    let fx = setup().await;

    let (_, intruder) = signup_and_login(&fx.app, "intruder@example.com").await;

    for endpoint in ["overview", "referrals", "pages", "geo", "breakdown"] {
        let uri = format!("/api/analytics/{}/{endpoint}", fx.site_id);
        let response = fx
            .app
            .clone()
            .oneshot(get_with_token(&uri, &intruder))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{endpoint}");
    }

    let response = fx
        .app
        .oneshot(get_with_token("/api/analytics/site_missing/overview", &fx.token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
