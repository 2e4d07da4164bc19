use crate::models::{DbAppointment, DbBookedInterval};
use chrono::{DateTime, Utc};
use eyre::Result;
use slotdesk_core::models::appointment::{AppointmentStatus, NewAppointment, NotificationStatus};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Advisory lock key serializing appointment reservations.
const RESERVATION_LOCK: i64 = 0x5107_D35C;

const COLUMNS: &str = "id, first_name, last_name, birthdate, phone, email, reason, \
     duration_minutes, address, start_time, end_time, status, calendar_event_id, \
     idempotency_key, notification_status, created_at";

#[derive(Debug)]
pub enum ReserveOutcome {
    Reserved(DbAppointment),
    /// Another row occupies part of the window.
    Overlap,
    /// The idempotency key is already stored.
    DuplicateKey,
}

/// Inserts a `pending` appointment unless its window overlaps an existing row.
///
/// The overlap check and the insert run in one transaction holding a
/// transaction-scoped advisory lock, so concurrent reservations for the same
/// window cannot both pass the check.
pub async fn reserve_appointment(
    pool: &Pool<Postgres>,
    appointment: &NewAppointment,
) -> Result<ReserveOutcome> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(RESERVATION_LOCK)
        .execute(&mut *tx)
        .await?;

    let overlapping: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM appointments
        WHERE start_time < $2 AND end_time > $1
        "#,
    )
    .bind(appointment.start)
    .bind(appointment.end)
    .fetch_one(&mut *tx)
    .await?;

    if overlapping > 0 {
        tx.rollback().await?;
        return Ok(ReserveOutcome::Overlap);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let inserted = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments (
            id, first_name, last_name, birthdate, phone, email, reason,
            duration_minutes, address, start_time, end_time, status,
            idempotency_key, notification_status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&appointment.first_name)
    .bind(&appointment.last_name)
    .bind(appointment.birthdate)
    .bind(&appointment.phone)
    .bind(&appointment.email)
    .bind(&appointment.reason)
    .bind(appointment.duration_minutes)
    .bind(&appointment.address)
    .bind(appointment.start)
    .bind(appointment.end)
    .bind(AppointmentStatus::Pending.as_str())
    .bind(&appointment.idempotency_key)
    .bind(NotificationStatus::Pending.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    match inserted {
        Ok(row) => {
            tx.commit().await?;
            Ok(ReserveOutcome::Reserved(row))
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Ok(ReserveOutcome::DuplicateKey)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn confirm_appointment(
    pool: &Pool<Postgres>,
    id: Uuid,
    calendar_event_id: &str,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2, calendar_event_id = $3
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(AppointmentStatus::Confirmed.as_str())
    .bind(calendar_event_id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn update_notification_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: NotificationStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE appointments
        SET notification_status = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {COLUMNS} FROM appointments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn get_appointment_by_idempotency_key(
    pool: &Pool<Postgres>,
    key: &str,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {COLUMNS} FROM appointments WHERE idempotency_key = $1"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn delete_appointment(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Windows of every stored appointment, pending ones included, that overlap
/// `[start, end)`.
pub async fn get_booked_intervals(
    pool: &Pool<Postgres>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DbBookedInterval>> {
    let intervals = sqlx::query_as::<_, DbBookedInterval>(
        r#"
        SELECT start_time, end_time
        FROM appointments
        WHERE start_time < $2 AND end_time > $1
        ORDER BY start_time ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(intervals)
}
