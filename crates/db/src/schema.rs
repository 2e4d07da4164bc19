use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

// Prepared statements take one command each, so indexes are created one by one.
const INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_appointments_start_time ON appointments(start_time)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_end_time ON appointments(end_time)",
    "CREATE INDEX IF NOT EXISTS idx_conversation_drafts_updated_at ON conversation_drafts(updated_at)",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            first_name VARCHAR(255) NOT NULL,
            last_name VARCHAR(255) NOT NULL,
            birthdate DATE NOT NULL,
            phone VARCHAR(64) NOT NULL,
            email VARCHAR(320) NOT NULL,
            reason TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            address TEXT NULL,
            start_time TIMESTAMP WITH TIME ZONE NOT NULL,
            end_time TIMESTAMP WITH TIME ZONE NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'pending',
            calendar_event_id VARCHAR(512) NULL,
            idempotency_key VARCHAR(255) NOT NULL UNIQUE,
            notification_status VARCHAR(16) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_appointment_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create conversation_drafts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_drafts (
            session_id VARCHAR(255) PRIMARY KEY,
            draft JSONB NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create oauth_tokens table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_tokens (
            provider VARCHAR(64) PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT NULL,
            expires_at TIMESTAMP WITH TIME ZONE NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
