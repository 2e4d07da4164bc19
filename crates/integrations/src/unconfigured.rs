//! Stand-in for a service whose settings are missing. The server still
//! starts; requests that need the service fail with a configuration error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::models::{
    appointment::Appointment, chat::OutgoingMail, slot::BusyInterval,
};
use slotdesk_core::ports::{CalendarService, ChatModel, KnowledgeSearch, Mailer};

#[derive(Debug, Clone)]
pub struct Unconfigured {
    service: &'static str,
}

impl Unconfigured {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }

    fn error(&self) -> BookingError {
        BookingError::Configuration(format!("{} is not configured", self.service))
    }
}

#[async_trait]
impl CalendarService for Unconfigured {
    async fn busy_intervals(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>> {
        Err(self.error())
    }

    async fn create_event(&self, _appointment: &Appointment) -> BookingResult<String> {
        Err(self.error())
    }

    async fn delete_event(&self, _event_id: &str) -> BookingResult<()> {
        Err(self.error())
    }
}

#[async_trait]
impl Mailer for Unconfigured {
    async fn send(&self, _mail: &OutgoingMail) -> BookingResult<()> {
        Err(self.error())
    }
}

#[async_trait]
impl ChatModel for Unconfigured {
    async fn complete(&self, _system: &str, _user: &str) -> BookingResult<String> {
        Err(self.error())
    }
}

#[async_trait]
impl KnowledgeSearch for Unconfigured {
    async fn search(&self, _query: &str, _top: usize) -> BookingResult<Vec<String>> {
        Err(self.error())
    }
}
