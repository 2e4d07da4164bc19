use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::models::token::OAuthToken;
use slotdesk_core::ports::{IdentityProvider, TokenStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::GraphConfig;
use crate::{check_status, request_failed};

/// Provider key of the stored Graph token.
pub const PROVIDER: &str = "microsoft";
pub const SCOPES: &str = "offline_access User.Read Calendars.ReadWrite Mail.Send";

/// Tokens are refreshed this long before they expire.
const REFRESH_LEEWAY_SECONDS: i64 = 60;
/// Used when the token response carries no lifetime.
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> OAuthToken {
        OAuthToken {
            provider: PROVIDER.to_string(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now
                + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS)),
            updated_at: now,
        }
    }
}

/// Authorization-code flow against the Microsoft identity platform.
pub struct GraphAuth {
    config: GraphConfig,
    http: Client,
}

impl GraphAuth {
    pub fn new(config: GraphConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub async fn refresh(&self, refresh_token: &str) -> BookingResult<OAuthToken> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> BookingResult<OAuthToken> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", SCOPES),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| request_failed("Microsoft sign-in", e))?;

        if response.status().is_client_error() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Token request rejected with {}: {}", status, body);
            return Err(BookingError::Authentication(
                "Microsoft sign-in rejected the authorization".to_string(),
            ));
        }
        let response = check_status("Microsoft sign-in", response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BookingError::Upstream(format!("Invalid token response: {}", e)))?;
        Ok(token.into_token(Utc::now()))
    }
}

#[async_trait]
impl IdentityProvider for GraphAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}",
            self.config.authorize_endpoint(),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> BookingResult<OAuthToken> {
        self.request_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }
}

/// Hands out a valid Graph access token, loading it from the token store
/// and refreshing it when it is about to expire.
pub struct TokenManager {
    auth: Arc<GraphAuth>,
    store: Arc<dyn TokenStore>,
    // Held across refreshes so concurrent callers do not refresh twice.
    cached: Mutex<Option<OAuthToken>>,
}

impl TokenManager {
    pub fn new(auth: Arc<GraphAuth>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            auth,
            store,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> BookingResult<String> {
        let now = Utc::now();
        let leeway = Duration::seconds(REFRESH_LEEWAY_SECONDS);
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired(now, leeway)) {
            return Ok(token.access_token.clone());
        }

        let stored = self.store.load(PROVIDER).await?.ok_or_else(|| {
            BookingError::Configuration(
                "The calendar is not connected. Open /calendar to sign in.".to_string(),
            )
        })?;
        if !stored.is_expired(now, leeway) {
            let access_token = stored.access_token.clone();
            *cached = Some(stored);
            return Ok(access_token);
        }

        let refresh_token = stored.refresh_token.as_deref().ok_or_else(|| {
            BookingError::Configuration(
                "The calendar sign-in expired. Open /calendar to sign in again.".to_string(),
            )
        })?;
        let mut refreshed = self.auth.refresh(refresh_token).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = stored.refresh_token.clone();
        }
        self.store.save(&refreshed).await?;
        info!("Refreshed Microsoft Graph access token");

        let access_token = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(access_token)
    }
}

/// Saving through the manager also replaces the cached token, so a new
/// sign-in takes effect immediately.
#[async_trait]
impl TokenStore for TokenManager {
    async fn load(&self, provider: &str) -> BookingResult<Option<OAuthToken>> {
        self.store.load(provider).await
    }

    async fn save(&self, token: &OAuthToken) -> BookingResult<()> {
        self.store.save(token).await?;
        if token.provider == PROVIDER {
            *self.cached.lock().await = Some(token.clone());
        }
        Ok(())
    }
}
