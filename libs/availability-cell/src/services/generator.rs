// libs/availability-cell/src/services/generator.rs
use chrono::{NaiveTime, Timelike};

use shared_models::scheduling::{NewAvailabilityWindow, SlotSpec};

use crate::models::AvailabilityError;

/// Partitions `[start, end)` into back-to-back slots of `slot_minutes`.
///
/// The n-th slot starts at `start + n * slot_minutes`. A trailing interval
/// shorter than one slot is dropped, never emitted short, so no slot ends
/// after the window does.
pub fn generate_slots(window: &NewAvailabilityWindow) -> Result<Vec<SlotSpec>, AvailabilityError> {
    if window.start_time >= window.end_time {
        return Err(AvailabilityError::InvalidInput(
            "start time must be before end time".to_string(),
        ));
    }
    if window.slot_minutes < 1 {
        return Err(AvailabilityError::InvalidInput(
            "slot duration must be at least one minute".to_string(),
        ));
    }

    // Seconds from midnight; NaiveTime addition would wrap past 24:00.
    let start = window.start_time.num_seconds_from_midnight();
    let end = window.end_time.num_seconds_from_midnight();
    let step = (window.slot_minutes as u32).saturating_mul(60);
    let count = (end - start) / step;

    (0..count)
        .map(|n| {
            let slot_start = start + n * step;
            let slot_end = slot_start + step;
            Ok(SlotSpec {
                date: window.date,
                start_time: time_at(slot_start)?,
                end_time: time_at(slot_end)?,
            })
        })
        .collect()
}

fn time_at(seconds: u32) -> Result<NaiveTime, AvailabilityError> {
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
        .ok_or_else(|| AvailabilityError::InvalidInput("slot extends past midnight".to_string()))
}
