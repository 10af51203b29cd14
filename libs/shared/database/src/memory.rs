// libs/shared/database/src/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::{
    AvailabilityWindow, Booking, BookingFilter, BookingStatus, NewAvailabilityWindow, Slot,
    SlotClaim, SlotQuery, SlotSpec,
};

use crate::store::{
    SchedulingStore, StoreError, ACTIVE_PATIENT_SLOT_CONSTRAINT, ACTIVE_SLOT_CONSTRAINT,
    SLOT_DOCTOR_START_CONSTRAINT,
};

#[derive(Default)]
struct Tables {
    windows: HashMap<Uuid, AvailabilityWindow>,
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
}

impl Tables {
    fn active_booking_for_slot(&self, slot_id: Uuid) -> Option<&Booking> {
        self.bookings
            .values()
            .find(|b| b.status.is_active() && b.slot_id == Some(slot_id))
    }

    fn active_booking_for_patient(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Option<&Booking> {
        self.bookings.values().find(|b| {
            b.status.is_active()
                && b.doctor_id == doctor_id
                && b.patient_id == patient_id
                && b.date == date
                && b.start_time == start_time
        })
    }
}

/// Process-local store for development and tests.
///
/// Each atomic unit runs under one write guard and checks the same unique
/// constraints the Postgres schema declares, so it fails the same way.
#[derive(Default)]
pub struct MemorySchedulingStore {
    tables: RwLock<Tables>,
}

impl MemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulingStore for MemorySchedulingStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_window(
        &self,
        window: NewAvailabilityWindow,
        slots: Vec<SlotSpec>,
    ) -> Result<(AvailabilityWindow, Vec<Slot>), StoreError> {
        let mut tables = self.tables.write().await;

        let clash = slots.iter().any(|spec| {
            tables.slots.values().any(|s| {
                s.doctor_id == window.doctor_id
                    && s.date == spec.date
                    && s.start_time == spec.start_time
            })
        });
        if clash {
            return Err(StoreError::unique(SLOT_DOCTOR_START_CONSTRAINT));
        }

        let stored = AvailabilityWindow {
            id: Uuid::new_v4(),
            doctor_id: window.doctor_id,
            date: window.date,
            start_time: window.start_time,
            end_time: window.end_time,
            slot_minutes: window.slot_minutes,
            created_at: Utc::now(),
        };

        let created: Vec<Slot> = slots
            .into_iter()
            .map(|spec| Slot {
                id: Uuid::new_v4(),
                window_id: stored.id,
                doctor_id: stored.doctor_id,
                date: spec.date,
                start_time: spec.start_time,
                end_time: spec.end_time,
                is_claimed: false,
            })
            .collect();

        tables.windows.insert(stored.id, stored.clone());
        for slot in &created {
            tables.slots.insert(slot.id, slot.clone());
        }

        debug!("Stored window {} with {} slots", stored.id, created.len());
        Ok((stored, created))
    }

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, StoreError> {
        Ok(self.tables.read().await.windows.get(&window_id).cloned())
    }

    async fn list_windows(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityWindow>, StoreError> {
        let tables = self.tables.read().await;
        let mut windows: Vec<AvailabilityWindow> = tables
            .windows
            .values()
            .filter(|w| w.doctor_id == doctor_id && date.map_or(true, |d| w.date == d))
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.date, w.start_time));
        Ok(windows)
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.windows.contains_key(&window_id) {
            return Err(StoreError::NotFound(format!("availability window {}", window_id)));
        }

        let locked = tables
            .slots
            .values()
            .any(|s| s.window_id == window_id && s.is_claimed);
        if locked {
            return Ok(false);
        }

        let removed: Vec<Uuid> = tables
            .slots
            .values()
            .filter(|s| s.window_id == window_id)
            .map(|s| s.id)
            .collect();
        for slot_id in &removed {
            tables.slots.remove(slot_id);
        }
        // Mirrors ON DELETE SET NULL on bookings.slot_id.
        for booking in tables.bookings.values_mut() {
            if booking.slot_id.map_or(false, |id| removed.contains(&id)) {
                booking.slot_id = None;
            }
        }
        tables.windows.remove(&window_id);

        Ok(true)
    }

    async fn list_slots(&self, query: SlotQuery) -> Result<Vec<Slot>, StoreError> {
        let tables = self.tables.read().await;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| {
                s.doctor_id == query.doctor_id
                    && query.date.map_or(true, |d| s.date == d)
                    && (query.include_claimed || !s.is_claimed)
            })
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.start_time));
        Ok(slots)
    }

    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError> {
        Ok(self.tables.read().await.slots.get(&slot_id).cloned())
    }

    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .slots
            .values()
            .find(|s| {
                s.doctor_id == doctor_id
                    && s.date == date
                    && s.start_time == start_time
                    && s.end_time == end_time
            })
            .cloned())
    }

    async fn find_active_booking(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<Option<Booking>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .active_booking_for_patient(doctor_id, patient_id, date, start_time)
            .cloned())
    }

    async fn claim_slot(&self, claim: SlotClaim) -> Result<Booking, StoreError> {
        let mut tables = self.tables.write().await;

        let slot = tables
            .slots
            .get(&claim.slot_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("slot {}", claim.slot_id)))?;

        if slot.is_claimed || tables.active_booking_for_slot(slot.id).is_some() {
            return Err(StoreError::unique(ACTIVE_SLOT_CONSTRAINT));
        }
        if tables
            .active_booking_for_patient(slot.doctor_id, claim.patient_id, slot.date, slot.start_time)
            .is_some()
        {
            return Err(StoreError::unique(ACTIVE_PATIENT_SLOT_CONSTRAINT));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            doctor_id: slot.doctor_id,
            patient_id: claim.patient_id,
            slot_id: Some(slot.id),
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: BookingStatus::Scheduled,
            note: claim.note,
            created_at: Utc::now(),
            cancelled_at: None,
            cancelled_by: None,
        };

        if let Some(stored) = tables.slots.get_mut(&slot.id) {
            stored.is_claimed = true;
        }
        tables.bookings.insert(booking.id, booking.clone());

        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn release_booking(
        &self,
        booking_id: Uuid,
        cancelled_by: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.tables.write().await;

        let booking = match tables.bookings.get_mut(&booking_id) {
            Some(b) if b.status.is_active() => b,
            Some(_) => return Ok(None),
            None => return Err(StoreError::NotFound(format!("booking {}", booking_id))),
        };

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(Utc::now());
        booking.cancelled_by = Some(cancelled_by);
        let released = booking.clone();

        if let Some(slot) = released.slot_id.and_then(|id| tables.slots.get_mut(&id)) {
            slot.is_claimed = false;
        }

        Ok(Some(released))
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| {
                filter.doctor_id.map_or(true, |d| b.doctor_id == d)
                    && filter.patient_id.map_or(true, |p| b.patient_id == p)
                    && filter.status.map_or(true, |s| b.status == s)
                    && filter.date.map_or(true, |d| b.date == d)
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.date, b.start_time, b.created_at));
        Ok(bookings)
    }
}
