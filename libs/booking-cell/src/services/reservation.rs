// libs/booking-cell/src/services/reservation.rs
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::auth::{Caller, Role};
use shared_models::scheduling::{parse_date, parse_time, Booking, BookingFilter, SlotClaim};

use crate::models::{BookingError, BookingListQuery, CancelOutcome, ReserveRequest};

/// Sole writer of bookings. Holds no locks: every mutation is one atomic
/// store call and the store's unique indexes decide races.
pub struct SlotReservationService {
    store: Arc<dyn SchedulingStore>,
}

impl SlotReservationService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Claim a slot for the calling patient.
    pub async fn reserve(
        &self,
        caller: &Caller,
        slot_id: Uuid,
        note: Option<String>,
    ) -> Result<Booking, BookingError> {
        if caller.role != Role::Patient {
            return Err(BookingError::Forbidden(
                "Only patients may reserve slots".to_string(),
            ));
        }

        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Slot".to_string()))?;

        // Best effort; the patient/slot index still catches a racing duplicate.
        if self
            .store
            .find_active_booking(slot.doctor_id, caller.id, slot.date, slot.start_time)
            .await?
            .is_some()
        {
            warn!("Patient {} already holds slot {}", caller.id, slot_id);
            return Err(BookingError::DuplicateBooking);
        }

        if slot.is_claimed {
            debug!("Slot {} already claimed at lookup", slot_id);
            return Err(BookingError::SlotAlreadyClaimed);
        }

        let booking = self
            .store
            .claim_slot(SlotClaim {
                slot_id,
                patient_id: caller.id,
                note,
            })
            .await
            .map_err(|e| {
                let err = BookingError::from(e);
                warn!("Claim of slot {} by patient {} failed: {}", slot_id, caller.id, err);
                err
            })?;

        info!(
            "Booking {} created: patient {} with doctor {} on {} at {}",
            booking.id, booking.patient_id, booking.doctor_id, booking.date, booking.start_time
        );
        Ok(booking)
    }

    /// Resolve a slot by doctor, date and bounds, then reserve it.
    pub async fn reserve_at(
        &self,
        caller: &Caller,
        request: ReserveRequest,
    ) -> Result<Booking, BookingError> {
        let date = parse_date(&request.date).map_err(BookingError::InvalidInput)?;
        let start = parse_time(&request.slot_start).map_err(BookingError::InvalidInput)?;
        let end = parse_time(&request.slot_end).map_err(BookingError::InvalidInput)?;
        if start >= end {
            return Err(BookingError::InvalidInput(
                "slot start must be before slot end".to_string(),
            ));
        }

        let slot = self
            .store
            .find_slot(request.doctor_id, date, start, end)
            .await?
            .ok_or_else(|| BookingError::NotFound("Slot".to_string()))?;

        self.reserve(caller, slot.id, request.note).await
    }

    /// Cancel a booking and return its slot to the open pool.
    pub async fn cancel(
        &self,
        caller: &Caller,
        booking_id: Uuid,
    ) -> Result<CancelOutcome, BookingError> {
        let booking = self.load_visible(caller, booking_id).await?;

        if !booking.status.is_active() {
            debug!("Booking {} was already cancelled", booking_id);
            return Ok(CancelOutcome::AlreadyCancelled(booking));
        }

        match self.store.release_booking(booking_id, caller.id).await? {
            Some(released) => {
                info!("Booking {} cancelled by {}", booking_id, caller.id);
                Ok(CancelOutcome::Cancelled(released))
            }
            None => {
                // A concurrent cancel committed first.
                let current = self.store.get_booking(booking_id).await?.unwrap_or(booking);
                Ok(CancelOutcome::AlreadyCancelled(current))
            }
        }
    }

    pub async fn get_booking(
        &self,
        caller: &Caller,
        booking_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.load_visible(caller, booking_id).await
    }

    /// Bookings visible to the caller. Patients are pinned to their own
    /// bookings and doctors to their own calendar.
    pub async fn list_bookings(
        &self,
        caller: &Caller,
        query: BookingListQuery,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut filter = BookingFilter {
            doctor_id: query.doctor_id,
            patient_id: query.patient_id,
            status: query.status,
            date: query
                .date
                .as_deref()
                .map(parse_date)
                .transpose()
                .map_err(BookingError::InvalidInput)?,
        };

        match caller.role {
            Role::Patient => {
                if filter.patient_id.is_some_and(|id| id != caller.id) {
                    return Err(BookingError::Forbidden(
                        "Patients may only list their own bookings".to_string(),
                    ));
                }
                filter.patient_id = Some(caller.id);
            }
            Role::Doctor => {
                if filter.doctor_id.is_some_and(|id| id != caller.id) {
                    return Err(BookingError::Forbidden(
                        "Doctors may only list their own calendar".to_string(),
                    ));
                }
                filter.doctor_id = Some(caller.id);
            }
            Role::Admin => {}
        }

        debug!("Listing bookings with {:?}", filter);
        Ok(self.store.list_bookings(filter).await?)
    }

    // Participants and admins only; checked before any state is inspected.
    async fn load_visible(&self, caller: &Caller, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Booking".to_string()))?;

        if !caller.is_admin() && !booking.is_participant(caller.id) {
            warn!("User {} denied access to booking {}", caller.id, booking_id);
            return Err(BookingError::Forbidden(
                "Not a participant in this booking".to_string(),
            ));
        }

        Ok(booking)
    }
}
