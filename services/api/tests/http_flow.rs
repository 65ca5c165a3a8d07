//! End-to-end exercise of the HTTP surface against an in-memory database:
//! signup, timed memorization, vault verification, ledger, murajaah, and
//! stats, all through the router.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use api_lib::adapters::db::SqliteStore;
use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};

async fn app() -> Router {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:5173".to_string(),
    };
    let store = SqliteStore::connect(&config.database_url)
        .await
        .expect("in-memory store");
    let state = Arc::new(AppState {
        store: Arc::new(store),
        config: Arc::new(config),
    });
    build_router(state).expect("router")
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request(method, uri, cookie, body))
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn signup(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": email, "password": "hunter2hunter2" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    let session = set_cookie
        .split(';')
        .next()
        .expect("cookie value")
        .to_string();
    session
}

#[tokio::test]
async fn protected_routes_require_a_session_cookie() {
    let app = app().await;
    let (status, _) = send(&app, "GET", "/surahs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = signup(&app, "a@example.com").await;
    let (status, body) = send(&app, "GET", "/surahs/2", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Al-Baqarah");
    assert_eq!(body["verse_count"], 286);
}

#[tokio::test]
async fn duplicate_signup_and_bad_login_are_rejected() {
    let app = app().await;
    signup(&app, "b@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "b@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "b@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = app().await;
    let cookie = signup(&app, "c@example.com").await;

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/surahs", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verse_range_validation_happens_at_the_edge() {
    let app = app().await;
    let cookie = signup(&app, "d@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/memorizations",
        Some(&cookie),
        Some(json!({ "surah_number": 2, "from_verse": 0, "to_verse": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/memorizations",
        Some(&cookie),
        Some(json!({ "surah_number": 115, "from_verse": 1, "to_verse": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn memorization_to_ledger_flow() {
    let app = app().await;
    let cookie = signup(&app, "e@example.com").await;

    // Start memorizing Al-Baqarah 1-5; the first session starts with it.
    let (status, body) = send(
        &app,
        "POST",
        "/memorizations",
        Some(&cookie),
        Some(json!({ "surah_number": 2, "from_verse": 1, "to_verse": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();
    let session_id = body["session"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["session"]["duration_minutes"], 25);

    // The session is freshly started: running, nearly 25 minutes left.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/sessions/{session_id}/status"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], false);
    assert!(body["remaining_seconds"].as_i64().unwrap() > 0);

    // Pause toggles both ways.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{session_id}/pause"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "paused");
    let (_, body) = send(
        &app,
        "POST",
        &format!("/sessions/{session_id}/pause"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(body["state"], "resumed");

    // A running session blocks a second one.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/sessions"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Finish: the open session is closed, the entry completed, and the
    // range staged into the vault.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/finish"),
        Some(&cookie),
        Some(json!({ "confidence_level": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["status"], "completed");
    assert_eq!(body["entry"]["total_sessions_completed"], 1);
    assert_eq!(body["entry"]["total_time_minutes"], 25);
    assert_eq!(body["vault"]["consolidated"]["from_verse"], 1);
    assert_eq!(body["vault"]["consolidated"]["to_verse"], 5);
    let vault_id = body["vault"]["id"].as_str().unwrap().to_string();

    // Finishing twice is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/finish"),
        Some(&cookie),
        Some(json!({ "confidence_level": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", "/memorizations/completed/count", Some(&cookie), None).await;
    assert_eq!(body["count"], 1);

    // Reviewer confirmation folds the envelope into the ledger.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/vault/{vault_id}/verify"),
        Some(&cookie),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault"]["status"], "verified");
    assert_eq!(body["ledger"][0]["surah_number"], 2);
    assert_eq!(body["ledger"][0]["juz_number"], 1);
    assert_eq!(body["ledger"][0]["from_verse"], 1);
    assert_eq!(body["ledger"][0]["to_verse"], 5);
    assert_eq!(body["ledger"][0]["average_rating"], 5.0);

    // Verifying again is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/vault/{vault_id}/verify"),
        Some(&cookie),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", "/memorized", Some(&cookie), None).await;
    assert_eq!(body["by_surah"][0]["surah_number"], 2);
    assert_eq!(body["by_juz"][0]["juz_number"], 1);
}

#[tokio::test]
async fn direct_juz_add_widens_existing_records() {
    let app = app().await;
    let cookie = signup(&app, "f@example.com").await;

    // Seed a narrow record for (2, juz 1) first.
    let (status, _) = send(
        &app,
        "POST",
        "/memorized/surah",
        Some(&cookie),
        Some(json!({ "surah_number": 2, "from_verse": 10, "to_verse": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Adding the whole first juz covers Al-Fatihah and widens Al-Baqarah.
    let (status, body) = send(
        &app,
        "POST",
        "/memorized/juz",
        Some(&cookie),
        Some(json!({ "juz_number": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["surah_number"], 1);
    assert_eq!(records[0]["from_verse"], 1);
    assert_eq!(records[0]["to_verse"], 7);
    assert_eq!(records[1]["surah_number"], 2);
    assert_eq!(records[1]["from_verse"], 1);
    assert_eq!(records[1]["to_verse"], 141);
}

#[tokio::test]
async fn murajaah_over_verified_content_records_revisions() {
    let app = app().await;
    let cookie = signup(&app, "g@example.com").await;

    // Murajaah with nothing verified is a 404.
    let (status, _) = send(
        &app,
        "POST",
        "/murajaah",
        Some(&cookie),
        Some(json!({ "target": "surah", "identifier": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, _) = send(
        &app,
        "POST",
        "/memorized/surah",
        Some(&cookie),
        Some(json!({ "surah_number": 2, "from_verse": 1, "to_verse": 50 })),
    )
    .await;

    // Out-of-range identifiers are rejected outright; 257 in particular
    // must not narrow into juz 1 and pick up its targets.
    for identifier in [0, 31, 257] {
        let (status, _) = send(
            &app,
            "POST",
            "/murajaah",
            Some(&cookie),
            Some(json!({ "target": "juz", "identifier": identifier })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = send(
        &app,
        "POST",
        "/murajaah",
        Some(&cookie),
        Some(json!({ "target": "surah", "identifier": 115 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/murajaah",
        Some(&cookie),
        Some(json!({ "target": "surah", "identifier": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["targets"].as_array().unwrap().len(), 1);
    let session_id = body["session"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/murajaah/{session_id}/complete"),
        Some(&cookie),
        Some(json!({ "rating": 4, "notes": "solid recall" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["completed"], true);
    // The revision mean replaces the direct-add seed.
    assert_eq!(body["targets"][0]["average_rating"], 4.0);
    assert_eq!(body["targets"][0]["revisions"][0]["rating"], 4);
    assert!(body["targets"][0]["last_revision_date"].is_string());
}

#[tokio::test]
async fn revision_sessions_require_a_finished_entry() {
    let app = app().await;
    let cookie = signup(&app, "h@example.com").await;

    let (_, body) = send(
        &app,
        "POST",
        "/memorizations",
        Some(&cookie),
        Some(json!({ "surah_number": 112, "from_verse": 1, "to_verse": 4 })),
    )
    .await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();

    // Unfinished entry: premature revision.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/revisions"),
        Some(&cookie),
        Some(json!({ "duration_minutes": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/finish"),
        Some(&cookie),
        Some(json!({ "confidence_level": 5 })),
    )
    .await;

    // Off-menu duration.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/revisions"),
        Some(&cookie),
        Some(json!({ "duration_minutes": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/revisions"),
        Some(&cookie),
        Some(json!({ "duration_minutes": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/revisions/{session_id}/complete"),
        Some(&cookie),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    assert_eq!(body["rating"], 5);

    // The grade lands on the entry as a review event.
    let (_, body) = send(
        &app,
        "GET",
        &format!("/memorizations/{entry_id}/progress"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(body["entry"]["status"], "reviewing");
    assert_eq!(body["entry"]["review_events"][0]["rating"], 5);
}

#[tokio::test]
async fn stats_sum_completed_sessions_per_kind() {
    let app = app().await;
    let cookie = signup(&app, "i@example.com").await;

    // One completed ziyadah (25) via finish, one revision (15), one
    // murajaah (25).
    let (_, body) = send(
        &app,
        "POST",
        "/memorizations",
        Some(&cookie),
        Some(json!({ "surah_number": 1, "from_verse": 1, "to_verse": 7 })),
    )
    .await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();
    let (_, _) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/finish"),
        Some(&cookie),
        Some(json!({ "confidence_level": 4 })),
    )
    .await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/memorizations/{entry_id}/revisions"),
        Some(&cookie),
        Some(json!({ "duration_minutes": 15 })),
    )
    .await;
    let revision_id = body["id"].as_str().unwrap().to_string();
    let (_, _) = send(
        &app,
        "POST",
        &format!("/revisions/{revision_id}/complete"),
        Some(&cookie),
        Some(json!({ "rating": 4 })),
    )
    .await;

    let (_, _) = send(
        &app,
        "POST",
        "/memorized/surah",
        Some(&cookie),
        Some(json!({ "surah_number": 1, "from_verse": 1, "to_verse": 7 })),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/murajaah",
        Some(&cookie),
        Some(json!({ "target": "juz", "identifier": 1 })),
    )
    .await;
    let murajaah_id = body["session"]["id"].as_str().unwrap().to_string();
    let (_, _) = send(
        &app,
        "POST",
        &format!("/murajaah/{murajaah_id}/complete"),
        Some(&cookie),
        Some(json!({ "rating": 5 })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/stats?period=daily", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ziyadah"]["minutes"], 25);
    assert_eq!(body["revision"]["minutes"], 15);
    assert_eq!(body["murajaah"]["minutes"], 25);
    assert_eq!(body["total"]["minutes"], 65);

    let (status, body) = send(
        &app,
        "GET",
        "/stats/daily-breakdown",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let buckets = body["buckets"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["total_minutes"], 65);

    let (status, _) = send(
        &app,
        "GET",
        "/stats?period=hourly",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
