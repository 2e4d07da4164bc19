use crate::models::DbDraft;
use eyre::Result;
use slotdesk_core::models::draft::Draft;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};

/// Drafts untouched for longer than this are treated as abandoned.
pub const DRAFT_TTL_HOURS: i32 = 24;

pub async fn get_draft(pool: &Pool<Postgres>, session_id: &str) -> Result<Option<DbDraft>> {
    let draft = sqlx::query_as::<_, DbDraft>(
        r#"
        SELECT session_id, draft, updated_at
        FROM conversation_drafts
        WHERE session_id = $1
          AND updated_at > NOW() - make_interval(hours => $2)
        "#,
    )
    .bind(session_id)
    .bind(DRAFT_TTL_HOURS)
    .fetch_optional(pool)
    .await?;

    Ok(draft)
}

pub async fn upsert_draft(pool: &Pool<Postgres>, session_id: &str, draft: &Draft) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_drafts (session_id, draft, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (session_id)
        DO UPDATE SET draft = $2, updated_at = NOW()
        "#,
    )
    .bind(session_id)
    .bind(Json(draft))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_draft(pool: &Pool<Postgres>, session_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM conversation_drafts
        WHERE session_id = $1
        "#,
    )
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes abandoned drafts and returns how many were deleted.
pub async fn delete_expired_drafts(pool: &Pool<Postgres>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM conversation_drafts
        WHERE updated_at <= NOW() - make_interval(hours => $1)
        "#,
    )
    .bind(DRAFT_TTL_HOURS)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
