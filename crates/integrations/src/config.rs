use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;

pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 20;
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-05-01-preview";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Reads a trimmed, non-empty value.
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &str, service: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .ok_or_else(|| eyre!("{} is configured but {} is not set", service, key))
}

/// Microsoft Graph application registration and mailbox.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// `me` for the signed-in account, or a user principal name
    pub calendar_user: String,
    /// Sender mailbox; the calendar user when unset
    pub mail_sender: Option<String>,
    pub graph_base_url: String,
    pub login_base_url: String,
}

impl GraphConfig {
    /// Returns `None` when `GRAPH_CLIENT_ID` is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(client_id) = non_empty(&lookup, "GRAPH_CLIENT_ID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            tenant_id: non_empty(&lookup, "GRAPH_TENANT_ID").unwrap_or_else(|| "common".to_string()),
            client_id,
            client_secret: required(&lookup, "GRAPH_CLIENT_SECRET", "Microsoft Graph")?,
            redirect_uri: required(&lookup, "GRAPH_REDIRECT_URI", "Microsoft Graph")?,
            calendar_user: non_empty(&lookup, "GRAPH_CALENDAR_USER").unwrap_or_else(|| "me".to_string()),
            mail_sender: non_empty(&lookup, "MAIL_SENDER"),
            graph_base_url: GRAPH_BASE_URL.to_string(),
            login_base_url: LOGIN_BASE_URL.to_string(),
        }))
    }

    /// Path prefix of the calendar owner, e.g. `/me` or `/users/a%40b.de`.
    pub fn user_path(&self) -> String {
        user_path(&self.calendar_user)
    }

    pub fn sender_path(&self) -> String {
        user_path(self.mail_sender.as_deref().unwrap_or(&self.calendar_user))
    }

    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.login_base_url, self.tenant_id
        )
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base_url, self.tenant_id)
    }
}

fn user_path(user: &str) -> String {
    if user.eq_ignore_ascii_case("me") {
        "/me".to_string()
    } else {
        format!("/users/{}", urlencoding::encode(user))
    }
}

/// Azure OpenAI chat deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl OpenAiConfig {
    /// Returns `None` when `AZURE_OPENAI_ENDPOINT` is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(endpoint) = non_empty(&lookup, "AZURE_OPENAI_ENDPOINT") else {
            return Ok(None);
        };

        Ok(Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: required(&lookup, "AZURE_OPENAI_KEY", "Azure OpenAI")?,
            deployment: required(&lookup, "AZURE_OPENAI_DEPLOYMENT", "Azure OpenAI")?,
            api_version: non_empty(&lookup, "AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
        }))
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint,
            urlencoding::encode(&self.deployment),
            urlencoding::encode(&self.api_version)
        )
    }
}

/// Azure Cognitive Search index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index: String,
    pub api_version: String,
}

impl SearchConfig {
    /// Returns `None` when `AZURE_SEARCH_ENDPOINT` is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(endpoint) = non_empty(&lookup, "AZURE_SEARCH_ENDPOINT") else {
            return Ok(None);
        };

        Ok(Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: required(&lookup, "AZURE_SEARCH_KEY", "Azure Search")?,
            index: required(&lookup, "AZURE_SEARCH_INDEX", "Azure Search")?,
            api_version: non_empty(&lookup, "AZURE_SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
        }))
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint,
            urlencoding::encode(&self.index),
            urlencoding::encode(&self.api_version)
        )
    }
}

/// Everything the outbound adapters need. Unset services stay `None`.
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    pub graph: Option<GraphConfig>,
    pub openai: Option<OpenAiConfig>,
    pub search: Option<SearchConfig>,
    pub http_timeout: Duration,
}

impl IntegrationsConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_timeout = match non_empty(&lookup, "HTTP_TIMEOUT_SECONDS") {
            Some(value) => value
                .parse::<u64>()
                .wrap_err("HTTP_TIMEOUT_SECONDS must be a whole number of seconds")?,
            None => DEFAULT_HTTP_TIMEOUT_SECONDS,
        };

        Ok(Self {
            graph: GraphConfig::from_lookup(&lookup)?,
            openai: OpenAiConfig::from_lookup(&lookup)?,
            search: SearchConfig::from_lookup(&lookup)?,
            http_timeout: Duration::from_secs(http_timeout),
        })
    }
}
