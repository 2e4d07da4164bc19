//! # Ports
//!
//! Traits at the boundary between the scheduling logic and the systems it
//! talks to: the relational store, the remote calendar, mail delivery, the
//! identity provider, the language model and the search index.
//!
//! Every trait carries `#[automock]`, so tests can drive the orchestrators in
//! [`crate::scheduling`] and [`crate::conversation`] without any network or
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::errors::BookingResult;
use crate::models::{
    appointment::{Appointment, NewAppointment, NotificationStatus},
    chat::OutgoingMail,
    draft::Draft,
    slot::BusyInterval,
    token::OAuthToken,
};

#[automock]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_idempotency_key(&self, key: &str) -> BookingResult<Option<Appointment>>;

    /// Inserts a `pending` row. Fails with `BookingError::Conflict` when the
    /// window overlaps an existing row or the idempotency key is taken.
    async fn reserve(&self, appointment: &NewAppointment) -> BookingResult<Appointment>;

    async fn confirm(&self, id: Uuid, calendar_event_id: &str) -> BookingResult<Appointment>;

    async fn set_notification_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> BookingResult<()>;

    async fn get(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> BookingResult<bool>;

    /// Intervals of stored appointments overlapping `[start, end)`.
    async fn booked_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>>;
}

#[automock]
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self, session_id: &str) -> BookingResult<Option<Draft>>;

    async fn save(&self, session_id: &str, draft: &Draft) -> BookingResult<()>;

    async fn discard(&self, session_id: &str) -> BookingResult<()>;
}

#[automock]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, provider: &str) -> BookingResult<Option<OAuthToken>>;

    async fn save(&self, token: &OAuthToken) -> BookingResult<()>;
}

#[automock]
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>>;

    /// Creates the event and returns its remote id. The appointment's
    /// idempotency key is forwarded so a repeated call does not duplicate it.
    async fn create_event(&self, appointment: &Appointment) -> BookingResult<String>;

    /// Deleting an event that no longer exists is not an error.
    async fn delete_event(&self, event_id: &str) -> BookingResult<()>;
}

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> BookingResult<()>;
}

#[automock]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> BookingResult<OAuthToken>;
}

#[automock]
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> BookingResult<String>;
}

#[automock]
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Returns the text of up to `top` matching documents, best first.
    async fn search(&self, query: &str, top: usize) -> BookingResult<Vec<String>>;
}
