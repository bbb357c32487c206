// File: olivia-server/tests/api_tests.rs

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use olivia_core::services::DialogueConfig;
use olivia_core::test_utils::fixtures;
use olivia_core::utils::time::FixedClock;
use olivia_server::api::router;
use olivia_server::context::{ContextParts, ServerContext};
use olivia_server::gateways::DisabledGateway;

fn app() -> Router {
    let catalog = Arc::new(fixtures::catalog());
    let ctx = ServerContext::from_parts(ContextParts {
        reference: Arc::new(fixtures::reference()),
        catalog: catalog.clone(),
        enrollments: catalog,
        planner: Arc::new(DisabledGateway),
        narrator: Arc::new(DisabledGateway),
        clock: Arc::new(FixedClock(fixtures::now())),
        timezone: fixtures::TZ,
        config: DialogueConfig::default(),
    });
    router(Arc::new(ctx))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("infallible service");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_and_branches() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/api/v1/branches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_calendar_lists_filtered_sessions() {
    let app = app();
    let uri = "/api/v1/calendar?start=2025-01-06&end=2025-01-13&branch_ids=blue_ash&buckets=swim";
    let (status, body) = call(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["session_id"], "ba_swim_wed_0700");
    assert_eq!(rows[0]["remaining"], 2);
    assert_eq!(rows[0]["availability_color"], "amber");

    let (status, body) = call(&app, "GET", "/api/v1/calendar?start=2025-01-13&end=2025-01-06", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn test_session_lookup() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/v1/sessions/cl_swim_fri_0600", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branch_name"], "Clippard YMCA");

    let (status, body) = call(&app, "GET", "/api/v1/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_search_returns_tiers() {
    let app = app();
    let query = json!({
        "date_start": "2025-01-09",
        "date_end": "2025-01-10",
        "branch_ids": ["blue_ash"],
        "buckets": ["yoga"],
        "has_spots": true
    });
    let (status, body) = call(&app, "POST", "/api/v1/search", Some(query)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["meta"]["tiers_used"], json!(["primary", "nearby_same_day"]));
    assert_eq!(body["results"][1]["drive_minutes"], 12);
}

#[tokio::test]
async fn test_enroll_conflict_and_cancel() {
    let app = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/enroll",
        Some(json!({"session_id": "cc_swim_wed_1200", "member_id": "m1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 0);
    assert_eq!(body["availability_color"], "red");

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/enroll",
        Some(json!({"session_id": "cc_swim_wed_1200", "member_id": "m2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/enroll/cancel",
        Some(json!({"session_id": "cc_swim_wed_1200", "member_id": "m1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["was_enrolled"], true);
    assert_eq!(body["remaining"], 1);

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/enroll",
        Some(json!({"session_id": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_without_language_model() {
    let app = app();
    let turn = json!({
        "conversation_id": "web-1",
        "message": "any swim this week?",
        "ui": {"selected_branch_ids": ["blue_ash"], "selected_buckets": ["swim"]}
    });
    let (status, body) = call(&app, "POST", "/api/v1/chat", Some(turn)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_sessions"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["phase"], "ready");

    let turn = json!({"conversation_id": "web-1", "message": "option 1"});
    let (status, body) = call(&app, "POST", "/api/v1/chat", Some(turn)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrollment"]["session_id"], "ba_swim_wed_0700");
    assert_eq!(body["enrollment"]["remaining"], 1);
}
