use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde_json::{json, Value};

use availability_cell::router::availability_routes;
use booking_cell::router::booking_routes;
use shared_database::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/availability", availability_routes(state.clone()))
        .nest("/bookings", booking_routes(state))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.store.backend_name(),
        "configured": state.config.is_configured(),
        "supabase_configured": state.config.is_supabase_configured()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use shared_database::MemorySchedulingStore;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(config: &TestConfig) -> Router {
        create_router(AppState::new(config.to_arc(), Arc::new(MemorySchedulingStore::new())))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_store_backend() {
        let response = app(&TestConfig::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["store"], "memory");
        assert_eq!(body["configured"], true);
    }

    #[tokio::test]
    async fn test_publish_then_book_through_nested_routes() {
        let config = TestConfig::default();
        let app = app(&config);
        let doctor = TestUser::doctor("doctor@example.com");
        let patient = TestUser::patient("patient@example.com");

        let publish = Request::builder()
            .method("POST")
            .uri("/availability")
            .header("Authorization", format!("Bearer {}", JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None)))
            .header("Content-Type", "application/json")
            .body(Body::from(json!({
                "date": "2026-11-02",
                "start_time": "09:00",
                "end_time": "09:30",
                "slot_minutes": 10
            }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(publish).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reserve = Request::builder()
            .method("POST")
            .uri("/bookings")
            .header("Authorization", format!("Bearer {}", JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None)))
            .header("Content-Type", "application/json")
            .body(Body::from(json!({
                "doctor_id": doctor.id,
                "date": "2026-11-02",
                "slot_start": "09:10",
                "slot_end": "09:20"
            }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(reserve).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let slots = Request::builder()
            .uri(format!("/availability/doctors/{}/slots?date=2026-11-02", doctor.id))
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.oneshot(slots).await.unwrap()).await;
        assert_eq!(body["total"], 2);
    }
}
