use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use slotdesk_core::models::{
    appointment::{Appointment, AppointmentStatus, NotificationStatus},
    draft::Draft,
    slot::BusyInterval,
    token::OAuthToken,
};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub phone: String,
    pub email: String,
    pub reason: String,
    pub duration_minutes: i32,
    pub address: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub calendar_event_id: Option<String>,
    pub idempotency_key: String,
    pub notification_status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = eyre::Report;

    fn try_from(row: DbAppointment) -> Result<Self> {
        let status = AppointmentStatus::parse(&row.status)
            .ok_or_else(|| eyre!("Unknown appointment status '{}' on {}", row.status, row.id))?;
        let notification_status = NotificationStatus::parse(&row.notification_status)
            .ok_or_else(|| {
                eyre!(
                    "Unknown notification status '{}' on {}",
                    row.notification_status,
                    row.id
                )
            })?;

        Ok(Appointment {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            birthdate: row.birthdate,
            phone: row.phone,
            email: row.email,
            reason: row.reason,
            duration_minutes: row.duration_minutes,
            address: row.address,
            start: row.start_time,
            end: row.end_time,
            status,
            calendar_event_id: row.calendar_event_id,
            idempotency_key: row.idempotency_key,
            notification_status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct DbBookedInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<DbBookedInterval> for BusyInterval {
    fn from(row: DbBookedInterval) -> Self {
        BusyInterval::new(row.start_time, row.end_time)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbDraft {
    pub session_id: String,
    pub draft: Json<Draft>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbOAuthToken {
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbOAuthToken> for OAuthToken {
    fn from(row: DbOAuthToken) -> Self {
        OAuthToken {
            provider: row.provider,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
            updated_at: row.updated_at,
        }
    }
}
