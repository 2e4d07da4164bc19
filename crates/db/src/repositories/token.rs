use crate::models::DbOAuthToken;
use eyre::Result;
use slotdesk_core::models::token::OAuthToken;
use sqlx::{Pool, Postgres};

pub async fn get_token(pool: &Pool<Postgres>, provider: &str) -> Result<Option<DbOAuthToken>> {
    let token = sqlx::query_as::<_, DbOAuthToken>(
        r#"
        SELECT provider, access_token, refresh_token, expires_at, updated_at
        FROM oauth_tokens
        WHERE provider = $1
        "#,
    )
    .bind(provider)
    .fetch_optional(pool)
    .await?;

    Ok(token)
}

/// Stores the token for its provider. A refresh response without a new
/// refresh token keeps the stored one.
pub async fn upsert_token(pool: &Pool<Postgres>, token: &OAuthToken) -> Result<DbOAuthToken> {
    let stored = sqlx::query_as::<_, DbOAuthToken>(
        r#"
        INSERT INTO oauth_tokens (provider, access_token, refresh_token, expires_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (provider)
        DO UPDATE SET
            access_token = $2,
            refresh_token = COALESCE($3, oauth_tokens.refresh_token),
            expires_at = $4,
            updated_at = $5
        RETURNING provider, access_token, refresh_token, expires_at, updated_at
        "#,
    )
    .bind(&token.provider)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .bind(token.expires_at)
    .bind(token.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(stored)
}
