// libs/availability-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{AvailabilityWindow, Slot};

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Dates and times arrive as strings so malformed values surface as
/// `InvalidInput` rather than a generic body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    /// Defaults to the calling doctor. Required when an admin declares.
    pub doctor_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub slot_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindowResponse {
    pub window: AvailabilityWindow,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotListQuery {
    pub date: Option<String>,
    #[serde(default)]
    pub include_claimed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowListQuery {
    pub date: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid availability: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Availability overlaps an existing window for this doctor")]
    WindowOverlap,

    #[error("Availability window has booked slots and can no longer change")]
    WindowLocked,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        let message = err.to_string();
        match err {
            AvailabilityError::InvalidInput(_) => AppError::ValidationError(message),
            AvailabilityError::NotFound(_) => AppError::NotFound(message),
            AvailabilityError::Forbidden(_) => AppError::Forbidden(message),
            AvailabilityError::WindowOverlap => AppError::conflict("availability_overlap", message),
            AvailabilityError::WindowLocked => AppError::conflict("availability_locked", message),
            AvailabilityError::Store(StoreError::NotFound(what)) => {
                AppError::NotFound(format!("{} not found", what))
            }
            AvailabilityError::Store(_) => AppError::Database(message),
        }
    }
}
