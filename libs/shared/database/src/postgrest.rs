// libs/shared/database/src/postgrest.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{
    AvailabilityWindow, Booking, BookingFilter, NewAvailabilityWindow, Slot, SlotClaim,
    SlotQuery, SlotSpec,
};

use crate::store::{SchedulingStore, StoreError};
use crate::supabase::{PostgrestError, SupabaseClient};

const TIME_FORMAT: &str = "%H:%M:%S";

/// `SchedulingStore` over Supabase PostgREST.
///
/// Multi-row units are Postgres functions (see `supabase/migrations`), so
/// each runs in one transaction and uniqueness is decided at commit.
/// Requests use the service-role key: the services enforce clinic roles.
pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedWindow {
    window: AvailabilityWindow,
    slots: Vec<Slot>,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_key.as_str())
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, self.token(), None)
            .await
            .map_err(classify)?;
        decode_rows(rows)
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.select(path).await?.into_iter().next())
    }
}

/// Translates a transport-level failure into the store taxonomy. Unique
/// violations keep the constraint name so callers can tell them apart.
fn classify(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<PostgrestError>() {
        Some(pg) if pg.is_unique_violation() => {
            let constraint = pg.constraint().unwrap_or("unknown").to_string();
            warn!("Unique violation on {}", constraint);
            StoreError::UniqueViolation { constraint }
        }
        Some(pg) if pg.is_no_data_found() => StoreError::NotFound(pg.message.clone()),
        Some(pg) => StoreError::Backend(pg.to_string()),
        None => StoreError::Backend(err.to_string()),
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn encode_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn create_window(
        &self,
        window: NewAvailabilityWindow,
        slots: Vec<SlotSpec>,
    ) -> Result<(AvailabilityWindow, Vec<Slot>), StoreError> {
        debug!("Creating window for doctor {} on {} via RPC", window.doctor_id, window.date);

        let slot_rows: Vec<Value> = slots
            .iter()
            .map(|s| {
                json!({
                    "date": s.date,
                    "start_time": encode_time(s.start_time),
                    "end_time": encode_time(s.end_time),
                })
            })
            .collect();

        let created: Value = self
            .supabase
            .rpc(
                "create_availability_window",
                self.token(),
                json!({
                    "p_doctor_id": window.doctor_id,
                    "p_date": window.date,
                    "p_start_time": encode_time(window.start_time),
                    "p_end_time": encode_time(window.end_time),
                    "p_slot_minutes": window.slot_minutes,
                    "p_slots": slot_rows,
                }),
            )
            .await
            .map_err(classify)?;

        let created: CreatedWindow =
            serde_json::from_value(created).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok((created.window, created.slots))
    }

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, StoreError> {
        self.select_one(&format!("/rest/v1/availability_windows?id=eq.{}", window_id))
            .await
    }

    async fn list_windows(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityWindow>, StoreError> {
        let mut path = format!("/rest/v1/availability_windows?doctor_id=eq.{}", doctor_id);
        if let Some(date) = date {
            path.push_str(&format!("&date=eq.{}", date));
        }
        path.push_str("&order=date.asc,start_time.asc");
        self.select(&path).await
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<bool, StoreError> {
        self.supabase
            .rpc(
                "delete_availability_window",
                self.token(),
                json!({ "p_window_id": window_id }),
            )
            .await
            .map_err(classify)
    }

    async fn list_slots(&self, query: SlotQuery) -> Result<Vec<Slot>, StoreError> {
        let mut path = format!("/rest/v1/slots?doctor_id=eq.{}", query.doctor_id);
        if let Some(date) = query.date {
            path.push_str(&format!("&date=eq.{}", date));
        }
        if !query.include_claimed {
            path.push_str("&is_claimed=eq.false");
        }
        path.push_str("&order=date.asc,start_time.asc");
        self.select(&path).await
    }

    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError> {
        self.select_one(&format!("/rest/v1/slots?id=eq.{}", slot_id)).await
    }

    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&date=eq.{}&start_time=eq.{}&end_time=eq.{}",
            doctor_id,
            date,
            urlencoding::encode(&encode_time(start_time)),
            urlencoding::encode(&encode_time(end_time)),
        );
        self.select_one(&path).await
    }

    async fn find_active_booking(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<Option<Booking>, StoreError> {
        let path = format!(
            "/rest/v1/bookings?doctor_id=eq.{}&patient_id=eq.{}&date=eq.{}&start_time=eq.{}&status=eq.scheduled",
            doctor_id,
            patient_id,
            date,
            urlencoding::encode(&encode_time(start_time)),
        );
        self.select_one(&path).await
    }

    async fn claim_slot(&self, claim: SlotClaim) -> Result<Booking, StoreError> {
        debug!("Claiming slot {} for patient {} via RPC", claim.slot_id, claim.patient_id);

        let booking: Value = self
            .supabase
            .rpc(
                "claim_slot",
                self.token(),
                json!({
                    "p_slot_id": claim.slot_id,
                    "p_patient_id": claim.patient_id,
                    "p_note": claim.note,
                }),
            )
            .await
            .map_err(classify)?;

        serde_json::from_value(booking).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.select_one(&format!("/rest/v1/bookings?id=eq.{}", booking_id)).await
    }

    async fn release_booking(
        &self,
        booking_id: Uuid,
        cancelled_by: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        debug!("Releasing booking {} via RPC", booking_id);

        let rows: Vec<Value> = self
            .supabase
            .rpc(
                "release_booking",
                self.token(),
                json!({
                    "p_booking_id": booking_id,
                    "p_cancelled_by": cancelled_by,
                }),
            )
            .await
            .map_err(classify)?;

        Ok(decode_rows(rows)?.into_iter().next())
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let mut query_parts = Vec::new();

        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = filter.date {
            query_parts.push(format!("date=eq.{}", date));
        }
        query_parts.push("order=date.asc,start_time.asc,created_at.asc".to_string());

        let path = format!("/rest/v1/bookings?{}", query_parts.join("&"));
        self.select(&path).await
    }
}

