// libs/booking-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::caller;

use crate::models::{BookingListQuery, ReserveRequest, ReserveSlotRequest};
use crate::services::SlotReservationService;

// ==============================================================================
// RESERVATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn reserve_at(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<ReserveRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller(&user)?;
    let service = SlotReservationService::new(state.store.clone());

    let booking = service.reserve_at(&caller, request).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Slot reserved"
    })))
}

/// The body is optional; without one the booking carries no note.
#[axum::debug_handler]
pub async fn reserve_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
    request: Option<Json<ReserveSlotRequest>>,
) -> Result<Json<Value>, AppError> {
    let caller = caller(&user)?;
    let service = SlotReservationService::new(state.store.clone());

    let note = request.and_then(|Json(body)| body.note);
    let booking = service.reserve(&caller, slot_id, note).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Slot reserved"
    })))
}

/// Cancelling twice is reported as success with `already_cancelled` set.
#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller(&user)?;
    let service = SlotReservationService::new(state.store.clone());

    let outcome = service.cancel(&caller, booking_id).await?;
    let message = if outcome.already_cancelled() {
        "Booking was already cancelled"
    } else {
        "Booking cancelled"
    };

    Ok(Json(json!({
        "success": true,
        "already_cancelled": outcome.already_cancelled(),
        "booking": outcome.booking(),
        "message": message
    })))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller(&user)?;
    let service = SlotReservationService::new(state.store.clone());

    let booking = service.get_booking(&caller, booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = caller(&user)?;
    let service = SlotReservationService::new(state.store.clone());

    let bookings = service.list_bookings(&caller, query).await?;

    Ok(Json(json!({
        "success": true,
        "bookings": bookings,
        "total": bookings.len()
    })))
}
