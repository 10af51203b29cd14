// libs/booking-cell/src/services/conflict.rs
//! Turns store-level uniqueness failures into booking outcomes, and booking
//! outcomes into HTTP errors. Nothing here retries.

use tracing::error;

use shared_database::store::{
    StoreError, ACTIVE_PATIENT_SLOT_CONSTRAINT, ACTIVE_SLOT_CONSTRAINT,
};
use shared_models::error::AppError;

use crate::models::BookingError;

pub const SLOT_ALREADY_CLAIMED: &str = "slot_already_claimed";
pub const DUPLICATE_BOOKING: &str = "duplicate_booking";

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            e if e.violates(ACTIVE_SLOT_CONSTRAINT) => BookingError::SlotAlreadyClaimed,
            e if e.violates(ACTIVE_PATIENT_SLOT_CONSTRAINT) => BookingError::DuplicateBooking,
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::UniqueViolation { constraint } => {
                error!("Unexpected unique violation on {} during booking", constraint);
                BookingError::Store(StoreError::UniqueViolation { constraint })
            }
            e => BookingError::Store(e),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidInput(_) => AppError::ValidationError(message),
            BookingError::NotFound(_) => AppError::NotFound(message),
            BookingError::Forbidden(_) => AppError::Forbidden(message),
            BookingError::SlotAlreadyClaimed => AppError::conflict(SLOT_ALREADY_CLAIMED, message),
            BookingError::DuplicateBooking => AppError::conflict(DUPLICATE_BOOKING, message),
            BookingError::Store(_) => AppError::Database(message),
        }
    }
}
