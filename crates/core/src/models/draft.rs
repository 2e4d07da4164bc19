use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::appointment::BookAppointmentRequest;
use super::slot::Slot;

/// Which appointment field the conversation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Name,
    Birthdate,
    Phone,
    Email,
    Reason,
    Slot,
    Confirm,
}

/// Appointment fields collected turn by turn in a chat session.
///
/// The stage is never stored; it is derived from which fields are present,
/// so a draft loaded from storage always resumes at the right question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Slots last shown to the user, numbered from 1
    #[serde(default)]
    pub offered: Vec<Slot>,
}

impl Draft {
    pub fn stage(&self) -> Stage {
        if self.first_name.is_none() || self.last_name.is_none() {
            Stage::Name
        } else if self.birthdate.is_none() {
            Stage::Birthdate
        } else if self.phone.is_none() {
            Stage::Phone
        } else if self.email.is_none() {
            Stage::Email
        } else if self.reason.is_none() {
            Stage::Reason
        } else if self.start.is_none() || self.end.is_none() {
            Stage::Slot
        } else {
            Stage::Confirm
        }
    }

    pub fn choose_slot(&mut self, slot: &Slot) {
        self.start = Some(slot.start);
        self.end = Some(slot.end);
        self.offered.clear();
    }

    pub fn clear_slot(&mut self) {
        self.start = None;
        self.end = None;
        self.offered.clear();
    }

    /// Converts a complete draft into a booking request. Returns `None`
    /// while any required field is still missing.
    pub fn to_request(&self) -> Option<BookAppointmentRequest> {
        let start = self.start?;
        let end = self.end?;
        Some(BookAppointmentRequest {
            first_name: self.first_name.clone()?,
            last_name: self.last_name.clone()?,
            birthdate: self.birthdate?,
            phone: self.phone.clone()?,
            email: self.email.clone()?,
            reason: self.reason.clone()?,
            start,
            duration_minutes: Some((end - start).num_minutes()),
            address: None,
            idempotency_key: None,
        })
    }
}
