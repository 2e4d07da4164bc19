//! # Availability
//!
//! Free slots are candidate slots minus busy intervals. Busy intervals come
//! from the remote calendar's free/busy query and from appointment rows that
//! the calendar may not reflect yet.
//!
//! Intervals are half-open: a slot collides with a busy interval when
//! `slot.start < busy.end && slot.end > busy.start`. Before testing, busy
//! intervals are merged into a sorted list of disjoint ranges, so each
//! candidate needs one binary search instead of a scan over every interval.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::hours::BusinessHours;
use super::slots::{SlotParams, generate_slots};
use crate::errors::BookingResult;
use crate::models::slot::{BusyInterval, Slot};
use crate::ports::{AppointmentStore, CalendarService};

/// Sorts busy intervals and merges overlapping or touching ones.
/// Empty and inverted intervals are dropped.
pub fn merge_busy<I>(busy: I) -> Vec<BusyInterval>
where
    I: IntoIterator<Item = BusyInterval>,
{
    let mut intervals: Vec<BusyInterval> = busy.into_iter().filter(|b| !b.is_empty()).collect();
    intervals.sort_by_key(|b| (b.start, b.end));

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Whether `[start, end)` avoids every interval of a list built by [`merge_busy`].
pub fn is_free(merged: &[BusyInterval], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    // Merged intervals are disjoint, so their ends are sorted as well.
    let first_ending_after_start = merged.partition_point(|b| b.end <= start);
    merged
        .get(first_ending_after_start)
        .is_none_or(|b| b.start >= end)
}

/// Keeps the candidates that overlap no busy interval, dropping repeated ids.
pub fn free_slots<I>(candidates: Vec<Slot>, busy: I) -> Vec<Slot>
where
    I: IntoIterator<Item = BusyInterval>,
{
    let merged = merge_busy(busy);
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|slot| is_free(&merged, slot.start, slot.end))
        .filter(|slot| seen.insert(slot.id.clone()))
        .collect()
}

/// Computes free slots from business hours, the remote calendar and stored bookings.
pub struct AvailabilityFinder {
    calendar: Arc<dyn CalendarService>,
    store: Arc<dyn AppointmentStore>,
    hours: BusinessHours,
    defaults: SlotParams,
}

impl AvailabilityFinder {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        store: Arc<dyn AppointmentStore>,
        hours: BusinessHours,
        defaults: SlotParams,
    ) -> Self {
        Self {
            calendar,
            store,
            hours,
            defaults,
        }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    pub fn defaults(&self) -> &SlotParams {
        &self.defaults
    }

    pub async fn find(&self, params: &SlotParams, now: DateTime<Utc>) -> BookingResult<Vec<Slot>> {
        let candidates = generate_slots(&self.hours, params, now);
        let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
            return Ok(Vec::new());
        };
        let (window_start, window_end) = (first.start, last.end);

        let mut busy = self.calendar.busy_intervals(window_start, window_end).await?;
        busy.extend(self.store.booked_intervals(window_start, window_end).await?);

        let total = candidates.len();
        let free = free_slots(candidates, busy);
        debug!(
            "Availability between {} and {}: {} of {} candidate slots free",
            window_start,
            window_end,
            free.len(),
            total
        );
        Ok(free)
    }

    pub async fn find_default(&self, now: DateTime<Utc>) -> BookingResult<Vec<Slot>> {
        self.find(&self.defaults, now).await
    }
}
