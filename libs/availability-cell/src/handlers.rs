// libs/availability-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{caller, require_role};

use crate::models::{CreateAvailabilityRequest, SlotListQuery, WindowListQuery};
use crate::services::AvailabilityService;

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    let caller = caller(&user)?;

    let service = AvailabilityService::new(state.store.clone());
    let created = service.create_availability(&caller, request).await?;

    Ok(Json(json!({
        "success": true,
        "window": created.window,
        "slots": created.slots,
        "message": format!("Availability published with {} slots", created.slots.len())
    })))
}

#[axum::debug_handler]
pub async fn list_windows(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<WindowListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    let windows = service.list_windows(doctor_id, query.date.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "windows": windows,
        "total": windows.len()
    })))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    let slots = service
        .list_slots(doctor_id, query.date.as_deref(), query.include_claimed)
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn withdraw_window(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    let caller = caller(&user)?;

    let service = AvailabilityService::new(state.store.clone());
    service.withdraw_window(&caller, window_id).await?;

    Ok(Json(json!({
        "success": true,
        "window_id": window_id,
        "message": "Availability window withdrawn"
    })))
}
