//! # Booking Handlers
//!
//! Form-based booking. `POST /book` runs the booking saga in
//! [`BookingWriter`](slotdesk_core::scheduling::booking::BookingWriter) and
//! is idempotent: a retried request with the same key returns the original
//! appointment with `200 OK` instead of `201 Created`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use slotdesk_core::{
    errors::BookingError,
    models::appointment::{
        Appointment, BookAppointmentRequest, BookAppointmentResponse, BookingFormResponse,
        StatusResponse,
    },
};
use tracing::info;
use uuid::Uuid;

use super::chat::header_value;
use crate::{ApiState, middleware::error_handling::AppError};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Slots listed in the booking form.
pub const FORM_SLOT_LIMIT: usize = 20;

const REQUIRED_FIELDS: [&str; 7] = [
    "first_name",
    "last_name",
    "birthdate",
    "phone",
    "email",
    "reason",
    "start",
];

/// Handles `GET /book`: describes the form and lists the next free slots.
#[axum::debug_handler]
pub async fn booking_form(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<BookingFormResponse>, AppError> {
    let mut slots = state.availability.find_default(Utc::now()).await?;
    slots.truncate(FORM_SLOT_LIMIT);

    Ok(Json(BookingFormResponse {
        status: "ok".to_string(),
        message: "Send the fields below to this endpoint with POST to book an appointment"
            .to_string(),
        required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        duration_minutes: state.booking.default_duration().num_minutes(),
        slots,
    }))
}

/// Handles `POST /book`
///
/// The idempotency key is read from the `idempotency-key` header, then from
/// the `idempotency_key` body field. Requests without either get a fresh key
/// and are therefore never replayed.
///
/// # Errors
///
/// * `BookingError::Validation` - Invalid fields, or a time in the past or outside business hours
/// * `BookingError::Conflict` - The time is taken, or the same key is still being booked
/// * `BookingError::Upstream` - Calendar failure; nothing was booked
/// * `BookingError::Configuration` - The calendar is not connected
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookAppointmentResponse>), AppError> {
    let Json(request) =
        payload.map_err(|rejection| BookingError::Validation(rejection.body_text()))?;

    let key = header_value(&headers, IDEMPOTENCY_HEADER)
        .or_else(|| {
            request
                .idempotency_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = state.booking.book(request, key, Utc::now()).await?;
    let appointment = &outcome.appointment;

    let (status, message) = match (outcome.replayed, outcome.notification_sent) {
        (true, _) => (StatusCode::OK, "Appointment was already booked"),
        (false, true) => (StatusCode::CREATED, "Appointment booked"),
        (false, false) => (
            StatusCode::CREATED,
            "Appointment booked, but the confirmation email could not be sent",
        ),
    };
    info!("Booking request answered with {} for {}", status, appointment.id);

    Ok((
        status,
        Json(BookAppointmentResponse {
            status: "ok".to_string(),
            message: message.to_string(),
            appointment_id: Some(appointment.id),
            start: Some(appointment.start),
            end: Some(appointment.end),
            notification_sent: Some(outcome.notification_sent),
        }),
    ))
}

/// Handles `GET /appointments/:id`
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .appointments
        .get(id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

    Ok(Json(appointment))
}

/// Handles `DELETE /appointments/:id`: removes the calendar event and the
/// stored appointment.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let appointment = state.booking.cancel(id).await?;
    Ok(Json(StatusResponse::ok(format!(
        "Appointment on {} cancelled",
        appointment.start.to_rfc3339()
    ))))
}
