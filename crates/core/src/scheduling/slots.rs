use chrono::{DateTime, Datelike, Days, Duration, TimeZone, Utc};

use super::hours::BusinessHours;
use crate::errors::{BookingError, BookingResult};
use crate::models::slot::Slot;

pub const MAX_HORIZON_DAYS: u32 = 365;
/// Longest appointment that can be offered or booked.
pub const MAX_DURATION_MINUTES: i64 = 8 * 60;
/// Largest distance between candidate start times.
pub const MAX_STEP_MINUTES: i64 = 24 * 60;

/// Step, length and horizon used to enumerate candidate slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotParams {
    pub step: Duration,
    pub duration: Duration,
    pub horizon_days: u32,
}

impl Default for SlotParams {
    fn default() -> Self {
        Self {
            step: Duration::minutes(15),
            duration: Duration::minutes(30),
            horizon_days: 14,
        }
    }
}

impl SlotParams {
    /// Horizon is clamped to `1..=365` days. Step and duration are rejected
    /// outside `1..=MAX_STEP_MINUTES` and `1..=MAX_DURATION_MINUTES`.
    pub fn new(step_minutes: i64, duration_minutes: i64, horizon_days: u32) -> BookingResult<Self> {
        if !(1..=MAX_STEP_MINUTES).contains(&step_minutes) {
            return Err(BookingError::Validation(format!(
                "Slot step must be between 1 and {} minutes",
                MAX_STEP_MINUTES
            )));
        }
        if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(BookingError::Validation(format!(
                "Appointment duration must be between 1 and {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        Ok(Self {
            step: Duration::minutes(step_minutes),
            duration: Duration::minutes(duration_minutes),
            horizon_days: horizon_days.clamp(1, MAX_HORIZON_DAYS),
        })
    }
}

/// Enumerates candidate windows inside business hours, ordered by start.
///
/// Days are counted in the business time zone starting with today's local
/// date. Windows starting at or before `now` are skipped, as are local start
/// times that fall into a daylight-saving gap.
pub fn generate_slots(hours: &BusinessHours, params: &SlotParams, now: DateTime<Utc>) -> Vec<Slot> {
    let tz = hours.timezone;
    let today = now.with_timezone(&tz).date_naive();
    let mut slots = Vec::new();

    for offset in 0..params.horizon_days {
        let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        if !hours.is_business_day(date.weekday()) {
            continue;
        }

        let closing = date.and_time(hours.close);
        let mut local = date.and_time(hours.open);
        while let Some(local_end) = local.checked_add_signed(params.duration) {
            if local_end > closing {
                break;
            }
            if let Some(start) = tz.from_local_datetime(&local).earliest() {
                let start = start.with_timezone(&Utc);
                if start > now {
                    slots.push(Slot::new(start, start + params.duration));
                }
            }
            match local.checked_add_signed(params.step) {
                Some(next) => local = next,
                None => break,
            }
        }
    }

    slots
}
