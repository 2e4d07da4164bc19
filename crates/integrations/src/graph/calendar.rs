use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::models::{appointment::Appointment, slot::BusyInterval};
use slotdesk_core::ports::CalendarService;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::auth::TokenManager;
use super::{GraphDateTime, PREFER_UTC};
use crate::config::GraphConfig;
use crate::{check_status, request_failed};

const SERVICE: &str = "Microsoft Graph calendar";
/// Resolution of the availability view returned next to the schedule items.
const AVAILABILITY_INTERVAL_MINUTES: u32 = 15;
/// Longest window a single `getSchedule` call accepts.
pub const MAX_SCHEDULE_DAYS: i64 = 62;

/// Splits `start..end` into consecutive windows of at most
/// [`MAX_SCHEDULE_DAYS`]. Empty when `start >= end`.
pub fn schedule_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut windows = Vec::new();
    let mut from = start;
    while from < end {
        let to = from
            .checked_add_signed(Duration::days(MAX_SCHEDULE_DAYS))
            .map_or(end, |to| to.min(end));
        windows.push((from, to));
        from = to;
    }
    windows
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub schedules: Vec<String>,
    pub start_time: GraphDateTime,
    pub end_time: GraphDateTime,
    pub availability_view_interval: u32,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub value: Vec<ScheduleInformation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInformation {
    #[serde(default)]
    pub schedule_items: Vec<ScheduleItem>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleItem {
    pub status: String,
    pub start: GraphDateTime,
    pub end: GraphDateTime,
}

impl ScheduleResponse {
    /// Every item that is not `free` blocks its window, tentative ones included.
    pub fn busy_intervals(&self) -> Vec<BusyInterval> {
        self.value
            .iter()
            .flat_map(|schedule| schedule.schedule_items.iter())
            .filter(|item| !item.status.eq_ignore_ascii_case("free"))
            .filter_map(|item| match (item.start.to_utc(), item.end.to_utc()) {
                (Some(start), Some(end)) => Some(BusyInterval::new(start, end)),
                _ => {
                    warn!(
                        "Skipping schedule item with unreadable times {:?} - {:?}",
                        item.start, item.end
                    );
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub subject: String,
    pub body: EventBody,
    pub start: GraphDateTime,
    pub end: GraphDateTime,
    pub show_as: String,
    /// Graph drops a second create with the same id.
    pub transaction_id: String,
}

impl EventRequest {
    pub fn for_appointment(appointment: &Appointment, tz: Tz) -> Self {
        let local_birthdate = appointment.birthdate.format("%d.%m.%Y");
        let content = format!(
            "Name: {}\nDate of birth: {}\nPhone: {}\nEmail: {}\nReason: {}\nAddress: {}\nLocal start: {}",
            appointment.full_name(),
            local_birthdate,
            appointment.phone,
            appointment.email,
            appointment.reason,
            appointment.address.as_deref().unwrap_or("-"),
            appointment.start.with_timezone(&tz).format("%d.%m.%Y %H:%M"),
        );
        Self {
            subject: format!("Appointment: {}", appointment.full_name()),
            body: EventBody {
                content_type: "text".to_string(),
                content,
            },
            start: GraphDateTime::utc(appointment.start),
            end: GraphDateTime::utc(appointment.end),
            show_as: "busy".to_string(),
            transaction_id: appointment.idempotency_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    mail: Option<String>,
    user_principal_name: Option<String>,
}

/// The operator's calendar in Microsoft Graph.
pub struct GraphCalendar {
    config: GraphConfig,
    http: Client,
    tokens: Arc<TokenManager>,
    timezone: Tz,
    schedule_address: OnceCell<String>,
}

impl GraphCalendar {
    pub fn new(config: GraphConfig, http: Client, tokens: Arc<TokenManager>, timezone: Tz) -> Self {
        Self {
            config,
            http,
            tokens,
            timezone,
            schedule_address: OnceCell::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.config.graph_base_url, self.config.user_path(), path)
    }

    /// `getSchedule` needs an SMTP address. For `me` it is looked up once.
    async fn schedule_address(&self, access_token: &str) -> BookingResult<String> {
        self.schedule_address
            .get_or_try_init(|| async {
                let configured = self
                    .config
                    .mail_sender
                    .as_deref()
                    .unwrap_or(&self.config.calendar_user);
                if !configured.eq_ignore_ascii_case("me") {
                    return Ok::<_, BookingError>(configured.to_string());
                }

                let response = self
                    .http
                    .get(format!(
                        "{}/me?$select=mail,userPrincipalName",
                        self.config.graph_base_url
                    ))
                    .bearer_auth(access_token)
                    .send()
                    .await
                    .map_err(|e| request_failed(SERVICE, e))?;
                let user: GraphUser = check_status(SERVICE, response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| BookingError::Upstream(format!("Invalid user response: {}", e)))?;

                user.mail.or(user.user_principal_name).ok_or_else(|| {
                    BookingError::Configuration(
                        "The signed-in account has no mailbox address".to_string(),
                    )
                })
            })
            .await
            .cloned()
    }

    async fn schedule(
        &self,
        access_token: &str,
        address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>> {
        let request = ScheduleRequest {
            schedules: vec![address.to_string()],
            start_time: GraphDateTime::utc(start),
            end_time: GraphDateTime::utc(end),
            availability_view_interval: AVAILABILITY_INTERVAL_MINUTES,
        };

        let response = self
            .http
            .post(self.url("/calendar/getSchedule"))
            .bearer_auth(access_token)
            .header(PREFER_UTC.0, PREFER_UTC.1)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        let schedule: ScheduleResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| BookingError::Upstream(format!("Invalid schedule response: {}", e)))?;
        Ok(schedule.busy_intervals())
    }
}

#[async_trait]
impl CalendarService for GraphCalendar {
    async fn busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>> {
        let access_token = self.tokens.access_token().await?;
        let address = self.schedule_address(&access_token).await?;

        let mut busy = Vec::new();
        for (from, to) in schedule_windows(start, end) {
            busy.extend(self.schedule(&access_token, &address, from, to).await?);
        }
        debug!("Calendar reports {} busy intervals between {} and {}", busy.len(), start, end);
        Ok(busy)
    }

    async fn create_event(&self, appointment: &Appointment) -> BookingResult<String> {
        let access_token = self.tokens.access_token().await?;
        let request = EventRequest::for_appointment(appointment, self.timezone);

        let response = self
            .http
            .post(self.url("/events"))
            .bearer_auth(&access_token)
            .header(PREFER_UTC.0, PREFER_UTC.1)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        let created: CreatedEvent = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| BookingError::Upstream(format!("Invalid event response: {}", e)))?;

        info!("Created calendar event {} for appointment {}", created.id, appointment.id);
        Ok(created.id)
    }

    async fn delete_event(&self, event_id: &str) -> BookingResult<()> {
        let access_token = self.tokens.access_token().await?;
        let response = self
            .http
            .delete(self.url(&format!("/events/{}", urlencoding::encode(event_id))))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("Calendar event {} was already gone", event_id);
            return Ok(());
        }
        check_status(SERVICE, response).await?;
        info!("Deleted calendar event {}", event_id);
        Ok(())
    }
}
