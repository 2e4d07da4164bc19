use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A candidate appointment window that has not been booked yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    /// Builds a slot whose id is derived from its UTC start and length,
    /// so the same window always carries the same id.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let id = format!(
            "{}-{}",
            start.format("%Y%m%dT%H%M"),
            (end - start).num_minutes()
        );
        Self { id, start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, busy: &BusyInterval) -> bool {
        busy.overlaps(self.start, self.end)
    }
}

/// A half-open `[start, end)` range already occupied on a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableTimesQuery {
    /// Horizon in days, counted from today
    pub days: Option<u32>,

    /// Appointment length in minutes
    pub duration: Option<i64>,

    /// Distance between candidate start times in minutes
    pub step: Option<i64>,
}
