#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use slotdesk_api::{ApiState, middleware::auth::OAuthStates, router};
use slotdesk_core::{
    conversation::{desk::ChatDesk, knowledge::Assistant},
    models::appointment::{Appointment, AppointmentStatus, NewAppointment, NotificationStatus},
    ports::{
        IdentityProvider, MockAppointmentStore, MockCalendarService, MockChatModel, MockDraftStore,
        MockIdentityProvider, MockKnowledgeSearch, MockMailer, MockTokenStore,
    },
    scheduling::{
        availability::AvailabilityFinder, booking::BookingWriter, hours::BusinessHours,
        slots::SlotParams,
    },
};
use uuid::Uuid;

pub const OPERATOR: &str = "office@example.com";

/// Mocks for every port. Set expectations, then call [`TestContext::server`].
pub struct TestContext {
    pub calendar: MockCalendarService,
    pub store: MockAppointmentStore,
    pub mailer: MockMailer,
    pub drafts: MockDraftStore,
    pub search: MockKnowledgeSearch,
    pub model: MockChatModel,
    pub identity: Option<MockIdentityProvider>,
    pub tokens: MockTokenStore,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            calendar: MockCalendarService::new(),
            store: MockAppointmentStore::new(),
            mailer: MockMailer::new(),
            drafts: MockDraftStore::new(),
            search: MockKnowledgeSearch::new(),
            model: MockChatModel::new(),
            identity: None,
            tokens: MockTokenStore::new(),
        }
    }

    pub fn build_state(self) -> Arc<ApiState> {
        let hours = BusinessHours::default();
        let params = SlotParams::default();
        let calendar = Arc::new(self.calendar);
        let store = Arc::new(self.store);

        let availability = Arc::new(AvailabilityFinder::new(
            calendar.clone(),
            store.clone(),
            hours.clone(),
            params,
        ));
        let booking = Arc::new(BookingWriter::new(
            calendar,
            store.clone(),
            Arc::new(self.mailer),
            hours,
            params.duration,
            Some(OPERATOR.to_string()),
        ));
        let desk = Arc::new(ChatDesk::new(
            Arc::new(self.drafts),
            booking.clone(),
            availability.clone(),
            Arc::new(self.search),
            Arc::new(self.model),
            Assistant::default(),
        ));

        Arc::new(ApiState {
            booking,
            availability,
            desk,
            appointments: store,
            identity: self
                .identity
                .map(|identity| Arc::new(identity) as Arc<dyn IdentityProvider>),
            tokens: Arc::new(self.tokens),
            oauth_states: OAuthStates::new(),
        })
    }

    pub fn server(self) -> TestServer {
        TestServer::new(router(self.build_state())).unwrap()
    }
}

/// 10:00 Berlin time on the Monday at least a week from now.
pub fn next_monday_morning() -> DateTime<Utc> {
    let tz = chrono_tz::Europe::Berlin;
    let mut day = Utc::now().with_timezone(&tz).date_naive() + Days::new(7);
    while day.weekday() != Weekday::Mon {
        day = day + Days::new(1);
    }
    tz.with_ymd_and_hms(day.year(), day.month(), day.day(), 10, 0, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn booking_body(start: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "first_name": "Anna",
        "last_name": "Schmidt",
        "birthdate": "1990-03-01",
        "phone": "+49 170 1234567",
        "email": "anna@example.com",
        "symptom": "Check-up",
        "start": start.to_rfc3339(),
    })
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
        created_at: Utc::now(),
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
