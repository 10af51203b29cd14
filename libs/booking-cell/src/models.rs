// libs/booking-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::scheduling::{Booking, BookingStatus};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Reserve by slot coordinates rather than slot id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub doctor_id: Uuid,
    pub date: String,
    pub slot_start: String,
    pub slot_end: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReserveSlotRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub date: Option<String>,
}

// ==============================================================================
// OUTCOMES & ERRORS
// ==============================================================================

/// A second cancel is not an error; callers get the booking back either way.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(Booking),
    AlreadyCancelled(Booking),
}

impl CancelOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            CancelOutcome::Cancelled(b) | CancelOutcome::AlreadyCancelled(b) => b,
        }
    }

    pub fn already_cancelled(&self) -> bool {
        matches!(self, CancelOutcome::AlreadyCancelled(_))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum BookingError {
    #[error("Invalid booking request: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Slot no longer available, choose another")]
    SlotAlreadyClaimed,

    #[error("You already booked this slot")]
    DuplicateBooking,

    #[error("Store error: {0}")]
    Store(StoreError),
}
