// libs/availability-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::store::{SchedulingStore, StoreError, SLOT_DOCTOR_START_CONSTRAINT};
use shared_models::auth::{Caller, Role};
use shared_models::scheduling::{
    parse_date, parse_time, AvailabilityWindow, NewAvailabilityWindow, Slot, SlotQuery,
};

use crate::models::{AvailabilityError, AvailabilityWindowResponse, CreateAvailabilityRequest};
use crate::services::generator::generate_slots;

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Declare a window and persist it together with its generated slots
    pub async fn create_availability(
        &self,
        caller: &Caller,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilityWindowResponse, AvailabilityError> {
        let doctor_id = self.resolve_doctor(caller, request.doctor_id)?;
        debug!("Creating availability for doctor {} on {}", doctor_id, request.date);

        let window = NewAvailabilityWindow {
            doctor_id,
            date: parse_date(&request.date).map_err(AvailabilityError::InvalidInput)?,
            start_time: parse_time(&request.start_time).map_err(AvailabilityError::InvalidInput)?,
            end_time: parse_time(&request.end_time).map_err(AvailabilityError::InvalidInput)?,
            slot_minutes: request.slot_minutes,
        };

        let slots = generate_slots(&window)?;
        if slots.is_empty() {
            return Err(AvailabilityError::InvalidInput(
                "window is shorter than one slot".to_string(),
            ));
        }

        self.check_window_overlap(&window).await?;

        let (stored, slots) = self
            .store
            .create_window(window, slots)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent declaration covering the same start.
                e if e.violates(SLOT_DOCTOR_START_CONSTRAINT) => AvailabilityError::WindowOverlap,
                e => AvailabilityError::Store(e),
            })?;

        info!(
            "Availability window {} created for doctor {} with {} slots",
            stored.id,
            stored.doctor_id,
            slots.len()
        );

        Ok(AvailabilityWindowResponse { window: stored, slots })
    }

    /// Get a doctor's windows, optionally for one date
    pub async fn list_windows(
        &self,
        doctor_id: Uuid,
        date: Option<&str>,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let date = parse_optional_date(date)?;
        Ok(self.store.list_windows(doctor_id, date).await?)
    }

    /// Get a doctor's slots; open slots only unless `include_claimed`
    pub async fn list_slots(
        &self,
        doctor_id: Uuid,
        date: Option<&str>,
        include_claimed: bool,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        let date = parse_optional_date(date)?;
        debug!("Listing slots for doctor {} (date: {:?}, include_claimed: {})", doctor_id, date, include_claimed);

        Ok(self
            .store
            .list_slots(SlotQuery {
                doctor_id,
                date,
                include_claimed,
            })
            .await?)
    }

    /// Withdraw a window. Refused once any of its slots is claimed.
    pub async fn withdraw_window(
        &self,
        caller: &Caller,
        window_id: Uuid,
    ) -> Result<(), AvailabilityError> {
        let window = self
            .store
            .get_window(window_id)
            .await?
            .ok_or_else(|| AvailabilityError::NotFound("Availability window".to_string()))?;

        if !caller.is_admin() && window.doctor_id != caller.id {
            return Err(AvailabilityError::Forbidden(
                "Only the owning doctor or an admin may withdraw this window".to_string(),
            ));
        }

        match self.store.delete_window(window_id).await {
            Ok(true) => {
                info!("Availability window {} withdrawn", window_id);
                Ok(())
            }
            Ok(false) => {
                warn!("Refused to withdraw window {}: slots already booked", window_id);
                Err(AvailabilityError::WindowLocked)
            }
            Err(StoreError::NotFound(_)) => {
                Err(AvailabilityError::NotFound("Availability window".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // Private helper methods

    fn resolve_doctor(
        &self,
        caller: &Caller,
        requested: Option<Uuid>,
    ) -> Result<Uuid, AvailabilityError> {
        match (caller.role, requested) {
            (Role::Doctor, None) => Ok(caller.id),
            (Role::Doctor, Some(id)) if id == caller.id => Ok(id),
            (Role::Doctor, Some(_)) => Err(AvailabilityError::Forbidden(
                "Doctors may only declare their own availability".to_string(),
            )),
            (Role::Admin, Some(id)) => Ok(id),
            (Role::Admin, None) => Err(AvailabilityError::InvalidInput(
                "doctor_id is required when an admin declares availability".to_string(),
            )),
            (Role::Patient, _) => Err(AvailabilityError::Forbidden(
                "Only doctors and admins may declare availability".to_string(),
            )),
        }
    }

    /// The slot index only catches identical starts; windows on different
    /// grids can still interleave, so compare ranges as well.
    async fn check_window_overlap(
        &self,
        window: &NewAvailabilityWindow,
    ) -> Result<(), AvailabilityError> {
        let existing = self
            .store
            .list_windows(window.doctor_id, Some(window.date))
            .await?;

        let overlapping = existing
            .iter()
            .find(|w| w.start_time < window.end_time && window.start_time < w.end_time);

        if let Some(other) = overlapping {
            warn!(
                "Availability for doctor {} overlaps window {} ({} - {})",
                window.doctor_id, other.id, other.start_time, other.end_time
            );
            return Err(AvailabilityError::WindowOverlap);
        }

        Ok(())
    }
}

fn parse_optional_date(date: Option<&str>) -> Result<Option<NaiveDate>, AvailabilityError> {
    date.map(parse_date)
        .transpose()
        .map_err(AvailabilityError::InvalidInput)
}
