use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::store::{
    SchedulingStore, StoreError, ACTIVE_PATIENT_SLOT_CONSTRAINT, ACTIVE_SLOT_CONSTRAINT,
    SLOT_DOCTOR_START_CONSTRAINT,
};
use shared_database::SupabaseSchedulingStore;
use shared_models::scheduling::{
    BookingStatus, NewAvailabilityWindow, SlotClaim, SlotQuery, SlotSpec,
};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(server: &MockServer) -> SupabaseSchedulingStore {
    let config = TestConfig {
        supabase_url: server.uri(),
        ..TestConfig::default()
    };
    SupabaseSchedulingStore::new(&config.to_app_config())
}

fn unique_violation(constraint: &str) -> ResponseTemplate {
    ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::postgrest_error(
        "23505",
        &format!("duplicate key value violates unique constraint \"{}\"", constraint),
    ))
}

fn any_claim() -> SlotClaim {
    SlotClaim { slot_id: Uuid::new_v4(), patient_id: Uuid::new_v4(), note: None }
}

#[tokio::test]
async fn test_claim_slot_returns_booking() {
    let server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_slot"))
        .and(body_partial_json(json!({ "p_slot_id": slot_id, "p_patient_id": patient_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::booking_response(slot_id, doctor_id, patient_id, "scheduled"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let booking = store_for(&server)
        .claim_slot(SlotClaim { slot_id, patient_id, note: None })
        .await
        .unwrap();

    assert_eq!(booking.slot_id, Some(slot_id));
    assert_eq!(booking.status, BookingStatus::Scheduled);
}

#[tokio::test]
async fn test_claim_race_loser_reports_slot_constraint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_slot"))
        .respond_with(unique_violation(ACTIVE_SLOT_CONSTRAINT))
        .mount(&server)
        .await;

    let err = store_for(&server).claim_slot(any_claim()).await.unwrap_err();

    assert!(err.violates(ACTIVE_SLOT_CONSTRAINT));
}

#[tokio::test]
async fn test_claim_duplicate_patient_reports_patient_constraint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_slot"))
        .respond_with(unique_violation(ACTIVE_PATIENT_SLOT_CONSTRAINT))
        .mount(&server)
        .await;

    let err = store_for(&server).claim_slot(any_claim()).await.unwrap_err();

    assert!(err.violates(ACTIVE_PATIENT_SLOT_CONSTRAINT));
}

#[tokio::test]
async fn test_claim_missing_slot_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_slot"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            MockSupabaseResponses::postgrest_error("P0002", "slot not found"),
        ))
        .mount(&server)
        .await;

    let err = store_for(&server).claim_slot(any_claim()).await.unwrap_err();

    assert_matches!(err, StoreError::NotFound(_));
}

#[tokio::test]
async fn test_release_of_cancelled_booking_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/release_booking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let released = store_for(&server)
        .release_booking(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    assert!(released.is_none());
}

#[tokio::test]
async fn test_overlapping_window_reports_slot_constraint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_availability_window"))
        .respond_with(unique_violation(SLOT_DOCTOR_START_CONSTRAINT))
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
    let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let end = NaiveTime::from_hms_opt(9, 10, 0).unwrap();

    let err = store_for(&server)
        .create_window(
            NewAvailabilityWindow {
                doctor_id: Uuid::new_v4(),
                date,
                start_time: start,
                end_time: end,
                slot_minutes: 10,
            },
            vec![SlotSpec { date, start_time: start, end_time: end }],
        )
        .await
        .unwrap_err();

    assert!(err.violates(SLOT_DOCTOR_START_CONSTRAINT));
}

#[tokio::test]
async fn test_open_slot_listing_filters_claimed() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("is_claimed", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(Uuid::new_v4(), doctor_id, "09:00:00", "09:10:00", false)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let slots = store_for(&server)
        .list_slots(SlotQuery { doctor_id, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert!(!slots[0].is_claimed);
}

#[tokio::test]
async fn test_server_error_is_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = store_for(&server).get_booking(Uuid::new_v4()).await.unwrap_err();

    assert_matches!(err, StoreError::Backend(_));
}

#[tokio::test]
async fn test_missing_rpc_function_is_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_slot"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            MockSupabaseResponses::postgrest_error(
                "PGRST202",
                "Could not find the function public.claim_slot(p_note, p_patient_id, p_slot_id) in the schema cache",
            ),
        ))
        .mount(&server)
        .await;

    let err = store_for(&server).claim_slot(any_claim()).await.unwrap_err();

    assert_matches!(err, StoreError::Backend(_));
}

#[tokio::test]
async fn test_missing_table_is_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            MockSupabaseResponses::postgrest_error("42P01", "relation \"public.slots\" does not exist"),
        ))
        .mount(&server)
        .await;

    let err = store_for(&server).get_slot(Uuid::new_v4()).await.unwrap_err();

    assert_matches!(err, StoreError::Backend(_));
}

#[tokio::test]
async fn test_list_windows_filters_by_doctor_and_date() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let window_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_windows"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2026-11-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::window_response(window_id, doctor_id, "09:00:00", "10:00:00", 15)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let windows = store_for(&server)
        .list_windows(doctor_id, Some(NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()))
        .await
        .unwrap();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].id, window_id);
    assert_eq!(windows[0].slot_minutes, 15);
    assert_eq!(windows[0].end_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
}
