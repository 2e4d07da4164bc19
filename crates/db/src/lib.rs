pub mod models;
pub mod repositories;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::models::{
    appointment::{Appointment, NewAppointment, NotificationStatus},
    draft::Draft,
    slot::BusyInterval,
    token::OAuthToken,
};
use slotdesk_core::ports::{AppointmentStore, DraftStore, TokenStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use repositories::appointment::{self, ReserveOutcome};
use repositories::{draft as drafts, token as tokens};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL implementation of the storage ports.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn purge_expired_drafts(&self) -> Result<u64> {
        let removed = drafts::delete_expired_drafts(&self.pool).await?;
        if removed > 0 {
            info!("Removed {} abandoned conversation drafts", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find_by_idempotency_key(&self, key: &str) -> BookingResult<Option<Appointment>> {
        match appointment::get_appointment_by_idempotency_key(&self.pool, key).await? {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    async fn reserve(&self, new: &NewAppointment) -> BookingResult<Appointment> {
        match appointment::reserve_appointment(&self.pool, new).await? {
            ReserveOutcome::Reserved(row) => Ok(row.try_into()?),
            ReserveOutcome::Overlap => Err(BookingError::Conflict(
                "The selected time is no longer available".to_string(),
            )),
            ReserveOutcome::DuplicateKey => Err(BookingError::Conflict(
                "A booking with this idempotency key already exists".to_string(),
            )),
        }
    }

    async fn confirm(&self, id: Uuid, calendar_event_id: &str) -> BookingResult<Appointment> {
        appointment::confirm_appointment(&self.pool, id, calendar_event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?
            .try_into()
            .map_err(BookingError::Database)
    }

    async fn set_notification_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> BookingResult<()> {
        if appointment::update_notification_status(&self.pool, id, status).await? {
            Ok(())
        } else {
            Err(BookingError::NotFound(format!(
                "Appointment with ID {} not found",
                id
            )))
        }
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        match appointment::get_appointment_by_id(&self.pool, id).await? {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> BookingResult<bool> {
        Ok(appointment::delete_appointment(&self.pool, id).await?)
    }

    async fn booked_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<BusyInterval>> {
        let rows = appointment::get_booked_intervals(&self.pool, start, end).await?;
        Ok(rows.into_iter().map(BusyInterval::from).collect())
    }
}

#[async_trait]
impl DraftStore for PgStore {
    async fn load(&self, session_id: &str) -> BookingResult<Option<Draft>> {
        let row = drafts::get_draft(&self.pool, session_id).await?;
        Ok(row.map(|row| row.draft.0))
    }

    async fn save(&self, session_id: &str, draft: &Draft) -> BookingResult<()> {
        debug!("Saving draft for session {} at {:?}", session_id, draft.stage());
        drafts::upsert_draft(&self.pool, session_id, draft).await?;
        Ok(())
    }

    async fn discard(&self, session_id: &str) -> BookingResult<()> {
        drafts::delete_draft(&self.pool, session_id).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn load(&self, provider: &str) -> BookingResult<Option<OAuthToken>> {
        let row = tokens::get_token(&self.pool, provider).await?;
        Ok(row.map(OAuthToken::from))
    }

    async fn save(&self, token: &OAuthToken) -> BookingResult<()> {
        tokens::upsert_token(&self.pool, token).await?;
        Ok(())
    }
}
