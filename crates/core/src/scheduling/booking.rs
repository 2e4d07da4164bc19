//! # Booking Writer
//!
//! A confirmed booking touches three systems: the appointment table, the
//! remote calendar and mail delivery. None of them share a transaction, so the
//! write runs as an ordered saga:
//!
//! 1. Validate the request.
//! 2. Replay: an existing appointment with the same idempotency key is returned as is.
//! 3. Ask the calendar whether the window is busy.
//! 4. Reserve a `pending` row (the store rejects overlapping rows).
//! 5. Create the calendar event. On failure the reserved row is deleted.
//! 6. Confirm the row with the event id. On failure the event and the row are deleted.
//! 7. Send confirmation mail to the requester and the operator. Failure is
//!    recorded on the row and reported to the caller; the booking stands.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::hours::BusinessHours;
use super::slots::MAX_DURATION_MINUTES;
use crate::errors::{BookingError, BookingResult};
use crate::models::{
    appointment::{
        Appointment, AppointmentStatus, BookAppointmentRequest, NewAppointment, NotificationStatus,
    },
    chat::OutgoingMail,
};
use crate::ports::{AppointmentStore, CalendarService, Mailer};
use crate::validation;

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    /// The idempotency key matched an earlier booking; nothing was written.
    pub replayed: bool,
    pub notification_sent: bool,
}

pub struct BookingWriter {
    calendar: Arc<dyn CalendarService>,
    store: Arc<dyn AppointmentStore>,
    mailer: Arc<dyn Mailer>,
    hours: BusinessHours,
    default_duration: Duration,
    operator_email: Option<String>,
}

impl BookingWriter {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        store: Arc<dyn AppointmentStore>,
        mailer: Arc<dyn Mailer>,
        hours: BusinessHours,
        default_duration: Duration,
        operator_email: Option<String>,
    ) -> Self {
        Self {
            calendar,
            store,
            mailer,
            hours,
            default_duration,
            operator_email,
        }
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    pub async fn book(
        &self,
        request: BookAppointmentRequest,
        idempotency_key: String,
        now: DateTime<Utc>,
    ) -> BookingResult<BookingOutcome> {
        let new = self.validate(request, idempotency_key, now)?;

        if let Some(existing) = self.store.find_by_idempotency_key(&new.idempotency_key).await? {
            if existing.status == AppointmentStatus::Pending {
                return Err(BookingError::Conflict(
                    "A booking with this idempotency key is still in progress".to_string(),
                ));
            }
            info!(
                "Replaying booking {} for idempotency key {}",
                existing.id, new.idempotency_key
            );
            let notification_sent = existing.notification_status == NotificationStatus::Sent;
            return Ok(BookingOutcome {
                appointment: existing,
                replayed: true,
                notification_sent,
            });
        }

        let busy = self.calendar.busy_intervals(new.start, new.end).await?;
        if busy.iter().any(|b| b.overlaps(new.start, new.end)) {
            warn!("Calendar already busy between {} and {}", new.start, new.end);
            return Err(BookingError::Conflict(
                "The selected time is no longer available".to_string(),
            ));
        }

        let reserved = self.store.reserve(&new).await?;
        info!("Reserved appointment {} at {}", reserved.id, reserved.start);

        let event_id = match self.calendar.create_event(&reserved).await {
            Ok(event_id) => event_id,
            Err(err) => {
                error!("Calendar event for {} failed: {}", reserved.id, err);
                self.release_row(reserved.id).await;
                return Err(err);
            }
        };

        let confirmed = match self.store.confirm(reserved.id, &event_id).await {
            Ok(appointment) => appointment,
            Err(err) => {
                error!("Confirming appointment {} failed: {}", reserved.id, err);
                if let Err(e) = self.calendar.delete_event(&event_id).await {
                    error!("Compensation failed, calendar event {} kept: {}", event_id, e);
                }
                self.release_row(reserved.id).await;
                return Err(err);
            }
        };

        let notification_sent = self.send_confirmations(&confirmed).await;
        let notification_status = if notification_sent {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        if let Err(e) = self
            .store
            .set_notification_status(confirmed.id, notification_status)
            .await
        {
            warn!(
                "Could not record notification status for {}: {}",
                confirmed.id, e
            );
        }

        info!("Appointment {} booked for {}", confirmed.id, confirmed.start);
        Ok(BookingOutcome {
            appointment: Appointment {
                notification_status,
                ..confirmed
            },
            replayed: false,
            notification_sent,
        })
    }

    /// Removes the calendar event and the row. A cancellation notice is sent
    /// on a best-effort basis.
    pub async fn cancel(&self, id: Uuid) -> BookingResult<Appointment> {
        let appointment = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

        if let Some(event_id) = &appointment.calendar_event_id {
            self.calendar.delete_event(event_id).await?;
        }
        self.store.delete(id).await?;
        info!("Appointment {} cancelled", id);

        let notice = cancellation_mail(&appointment, self.hours.timezone);
        if let Err(e) = self.mailer.send(&notice).await {
            warn!("Cancellation notice for {} not sent: {}", id, e);
        }
        Ok(appointment)
    }

    fn validate(
        &self,
        request: BookAppointmentRequest,
        idempotency_key: String,
        now: DateTime<Utc>,
    ) -> BookingResult<NewAppointment> {
        let duration_minutes = request
            .duration_minutes
            .unwrap_or_else(|| self.default_duration.num_minutes());
        if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(BookingError::Validation(format!(
                "Duration must be between 1 and {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        let start = request.start;
        let end = start + Duration::minutes(duration_minutes);

        if start <= now {
            return Err(BookingError::Validation(
                "The appointment must start in the future".to_string(),
            ));
        }
        if !self.hours.contains(start, end) {
            return Err(BookingError::Validation(
                "The appointment must lie within business hours".to_string(),
            ));
        }

        let idempotency_key = idempotency_key.trim().to_string();
        if idempotency_key.is_empty() {
            return Err(BookingError::Validation(
                "Idempotency key must not be empty".to_string(),
            ));
        }

        Ok(NewAppointment {
            first_name: validation::check_name_part(&request.first_name, "First name")?,
            last_name: validation::check_name_part(&request.last_name, "Last name")?,
            birthdate: validation::check_birthdate(request.birthdate, now.date_naive())?,
            phone: validation::normalize_phone(&request.phone)?,
            email: validation::normalize_email(&request.email)?,
            reason: validation::check_reason(&request.reason)?,
            duration_minutes: duration_minutes as i32,
            address: request
                .address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            start,
            end,
            idempotency_key,
        })
    }

    async fn release_row(&self, id: Uuid) {
        if let Err(e) = self.store.delete(id).await {
            error!("Compensation failed, appointment {} kept: {}", id, e);
        }
    }

    async fn send_confirmations(&self, appointment: &Appointment) -> bool {
        let mut mails = vec![confirmation_mail(appointment, self.hours.timezone)];
        if let Some(operator) = &self.operator_email {
            mails.push(operator_mail(appointment, self.hours.timezone, operator));
        }

        let mut all_sent = true;
        for mail in &mails {
            if let Err(e) = self.mailer.send(mail).await {
                error!("Mail '{}' for {} failed: {}", mail.subject, appointment.id, e);
                all_sent = false;
            }
        }
        all_sent
    }
}

fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%Y %H:%M").to_string()
}

/// Mail bodies only interpolate into element text.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark::escape::escape_html(&mut escaped, value);
    escaped
}

pub fn confirmation_mail(appointment: &Appointment, tz: Tz) -> OutgoingMail {
    OutgoingMail {
        to: vec![appointment.email.clone()],
        subject: "Your appointment is confirmed".to_string(),
        html_body: format!(
            "<p>Hello {},</p><p>your appointment on <strong>{}</strong> ({} minutes) is confirmed.</p>\
             <p>Reason: {}</p><p>Reference: {}</p>",
            escape_html(&appointment.full_name()),
            local_time(appointment.start, tz),
            appointment.duration_minutes,
            escape_html(&appointment.reason),
            appointment.id
        ),
    }
}

pub fn operator_mail(appointment: &Appointment, tz: Tz, operator: &str) -> OutgoingMail {
    OutgoingMail {
        to: vec![operator.to_string()],
        subject: format!(
            "New appointment: {} on {}",
            appointment.full_name(),
            local_time(appointment.start, tz)
        ),
        html_body: format!(
            "<ul><li>Name: {}</li><li>Date of birth: {}</li><li>Phone: {}</li>\
             <li>Email: {}</li><li>Reason: {}</li><li>Address: {}</li><li>Start: {}</li>\
             <li>Duration: {} minutes</li></ul>",
            escape_html(&appointment.full_name()),
            appointment.birthdate.format("%d.%m.%Y"),
            escape_html(&appointment.phone),
            escape_html(&appointment.email),
            escape_html(&appointment.reason),
            escape_html(appointment.address.as_deref().unwrap_or("-")),
            local_time(appointment.start, tz),
            appointment.duration_minutes
        ),
    }
}

pub fn cancellation_mail(appointment: &Appointment, tz: Tz) -> OutgoingMail {
    OutgoingMail {
        to: vec![appointment.email.clone()],
        subject: "Your appointment was cancelled".to_string(),
        html_body: format!(
            "<p>Hello {},</p><p>your appointment on <strong>{}</strong> has been cancelled.</p>",
            escape_html(&appointment.full_name()),
            local_time(appointment.start, tz)
        ),
    }
}
