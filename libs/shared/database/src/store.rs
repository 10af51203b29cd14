// libs/shared/database/src/store.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::scheduling::{
    AvailabilityWindow, Booking, BookingFilter, NewAvailabilityWindow, Slot, SlotClaim,
    SlotQuery, SlotSpec,
};

/// Unique index over a slot's identity among active bookings. Losing a
/// concurrent claim surfaces as a violation of this constraint.
pub const ACTIVE_SLOT_CONSTRAINT: &str = "bookings_active_slot_key";

/// Unique index over (doctor, patient, date, start) among active bookings.
pub const ACTIVE_PATIENT_SLOT_CONSTRAINT: &str = "bookings_active_patient_slot_key";

/// Unique index over (doctor, date, start) for slots; rejects overlapping
/// availability windows.
pub const SLOT_DOCTOR_START_CONSTRAINT: &str = "slots_doctor_start_key";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("malformed store response: {0}")]
    Decode(String),

    #[error("store request failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation { constraint: constraint.to_string() }
    }

    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// Persistent home of windows, slots and bookings.
///
/// Every method that mutates more than one row is a single atomic unit.
/// Implementations arbitrate races through the unique constraints above
/// and report the loser as [`StoreError::UniqueViolation`]; callers must
/// not add their own locking on top.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Inserts the window and all of its slots, or nothing.
    async fn create_window(
        &self,
        window: NewAvailabilityWindow,
        slots: Vec<SlotSpec>,
    ) -> Result<(AvailabilityWindow, Vec<Slot>), StoreError>;

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, StoreError>;

    async fn list_windows(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityWindow>, StoreError>;

    /// Removes the window and its slots unless one of them is claimed.
    /// Returns `false` when a claimed slot blocked the delete.
    async fn delete_window(&self, window_id: Uuid) -> Result<bool, StoreError>;

    async fn list_slots(&self, query: SlotQuery) -> Result<Vec<Slot>, StoreError>;

    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError>;

    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError>;

    async fn find_active_booking(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<Option<Booking>, StoreError>;

    /// Marks the slot claimed and inserts its booking in one commit.
    async fn claim_slot(&self, claim: SlotClaim) -> Result<Booking, StoreError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Cancels a scheduled booking and unclaims its slot in one commit.
    /// Returns `None` when the booking was no longer scheduled.
    async fn release_booking(
        &self,
        booking_id: Uuid,
        cancelled_by: Uuid,
    ) -> Result<Option<Booking>, StoreError>;

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError>;
}
