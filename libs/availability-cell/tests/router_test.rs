use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use availability_cell::router::availability_routes;
use shared_database::{AppState, MemorySchedulingStore};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(config: &TestConfig) -> Router {
    let state = AppState::new(config.to_arc(), Arc::new(MemorySchedulingStore::new()));
    availability_routes(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn post_window(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_doctor_publishes_and_public_lists_slots() {
    let config = TestConfig::default();
    let app = create_test_app(&config);
    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let (status, body) = send(
        &app,
        post_window(&token, json!({
            "date": "2026-11-02",
            "start_time": "09:00",
            "end_time": "09:30",
            "slot_minutes": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["slots"].as_array().unwrap().len(), 3);

    let uri = format!("/doctors/{}/slots?date=2026-11-02", doctor.id);
    let (status, body) = send(&app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["slots"][0]["start_time"], "09:00:00");

    let uri = format!("/doctors/{}/windows", doctor.id);
    let (status, body) = send(&app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_publish_requires_token_and_role() {
    let config = TestConfig::default();
    let app = create_test_app(&config);
    let payload = json!({
        "date": "2026-11-02",
        "start_time": "09:00",
        "end_time": "10:00",
        "slot_minutes": 30
    });

    let unauthenticated = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(&app, unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let (status, body) = send(&app, post_window(&token, payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_overlap_and_invalid_input_codes() {
    let config = TestConfig::default();
    let app = create_test_app(&config);
    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let window = json!({
        "date": "2026-11-02",
        "start_time": "09:00",
        "end_time": "10:00",
        "slot_minutes": 20
    });
    let (status, _) = send(&app, post_window(&token, window.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_window(&token, window)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "availability_overlap");

    let (status, body) = send(
        &app,
        post_window(&token, json!({
            "date": "2026-11-03",
            "start_time": "10:00",
            "end_time": "09:00",
            "slot_minutes": 20
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn test_withdraw_window_over_http() {
    let config = TestConfig::default();
    let app = create_test_app(&config);
    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let (_, created) = send(
        &app,
        post_window(&token, json!({
            "date": "2026-11-02",
            "start_time": "14:00",
            "end_time": "15:00",
            "slot_minutes": 30
        })),
    )
    .await;
    let window_id = created["window"]["id"].as_str().unwrap().to_string();

    let other = TestUser::doctor("other@example.com");
    let other_token = JwtTestUtils::create_test_token(&other, &config.jwt_secret, None);
    let delete = |token: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/windows/{}", window_id))
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, delete(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, delete(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, delete(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_admin_publishes_on_behalf_of_doctor() {
    let config = TestConfig::default();
    let app = create_test_app(&config);
    let admin = TestUser::admin("admin@example.com");
    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);

    let (status, body) = send(
        &app,
        post_window(&token, json!({
            "date": "2026-11-02",
            "start_time": "09:00",
            "end_time": "10:00",
            "slot_minutes": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");

    let (status, body) = send(
        &app,
        post_window(&token, json!({
            "doctor_id": doctor.id,
            "date": "2026-11-02",
            "start_time": "09:00",
            "end_time": "10:00",
            "slot_minutes": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["window"]["doctor_id"], doctor.id);
    assert_eq!(body["slots"].as_array().unwrap().len(), 2);
}
