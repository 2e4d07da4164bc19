#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use slotdesk_core::models::appointment::{
    Appointment, AppointmentStatus, BookAppointmentRequest, NewAppointment, NotificationStatus,
};
use uuid::Uuid;

/// Thursday 2026-10-15, 10:00 in Berlin.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap()
}

/// Monday 2026-10-19, 09:00 in Berlin.
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()
}

pub fn book_request(start: DateTime<Utc>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        first_name: "Anna".to_string(),
        last_name: "Schmidt".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 1).unwrap(),
        phone: "+49 170 1234567".to_string(),
        email: "Anna@Example.com".to_string(),
        reason: "Check-up".to_string(),
        start,
        duration_minutes: Some(30),
        address: None,
        idempotency_key: None,
    }
}

pub fn stored(
    new: &NewAppointment,
    status: AppointmentStatus,
    calendar_event_id: Option<&str>,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        birthdate: new.birthdate,
        phone: new.phone.clone(),
        email: new.email.clone(),
        reason: new.reason.clone(),
        duration_minutes: new.duration_minutes,
        address: new.address.clone(),
        start: new.start,
        end: new.end,
        status,
        calendar_event_id: calendar_event_id.map(str::to_string),
        idempotency_key: new.idempotency_key.clone(),
        notification_status: NotificationStatus::Pending,
        created_at: now(),
    }
}

pub fn confirmed_appointment(start: DateTime<Utc>, key: &str) -> Appointment {
    let new = NewAppointment {
        first_name: "Anna".to_string(),
        last_name: "Schmidt".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 1).unwrap(),
        phone: "+49 170 1234567".to_string(),
        email: "anna@example.com".to_string(),
        reason: "Check-up".to_string(),
        duration_minutes: 30,
        address: None,
        start,
        end: start + chrono::Duration::minutes(30),
        idempotency_key: key.to_string(),
    };
    stored(&new, AppointmentStatus::Confirmed, Some("evt-1"))
}
