//! # API Configuration Module
//!
//! Loads the server, scheduling, assistant and integration settings from
//! environment variables.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins, `*` for any
//! - `API_REQUEST_TIMEOUT_SECONDS`: Server-side request timeout (default: 30)
//! - `BUSINESS_TIMEZONE`, `BUSINESS_OPEN`, `BUSINESS_CLOSE`, `BUSINESS_DAYS`:
//!   opening hours (default: Europe/Berlin, 09:00 to 17:00, Monday to Friday)
//! - `SLOT_STEP_MINUTES`, `APPOINTMENT_DURATION_MINUTES`, `BOOKING_HORIZON_DAYS`:
//!   slot grid (default: 15, 30, 14)
//! - `ASSISTANT_NAME`, `ASSISTANT_SITE`: how the chat assistant introduces itself
//! - `OPERATOR_EMAIL`: receives a copy of every booking
//!
//! Microsoft Graph, Azure OpenAI and Azure Search settings are read by
//! [`IntegrationsConfig`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use eyre::{Result, WrapErr, eyre};
use slotdesk_core::conversation::knowledge::Assistant;
use slotdesk_core::scheduling::{hours::BusinessHours, slots::SlotParams};
use slotdesk_integrations::config::IntegrationsConfig;
use tracing::Level;

/// Configuration for the appointment assistant server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotdesk_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub business_hours: BusinessHours,

    /// Default slot grid for availability and chat offers
    pub slot_params: SlotParams,

    pub assistant: Assistant,

    pub operator_email: Option<String>,

    pub integrations: IntegrationsConfig,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The DATABASE_URL environment variable is not set
    /// - A numeric, time or time zone value cannot be parsed
    /// - An integration is only partly configured
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Network settings
        let host = value("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = value("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url =
            value("DATABASE_URL").ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

        // Logging settings
        let log_level = match value("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = value("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = value("API_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .wrap_err("Invalid API_REQUEST_TIMEOUT_SECONDS value")?;

        // Scheduling settings
        let timezone: Tz = value("BUSINESS_TIMEZONE")
            .unwrap_or_else(|| "Europe/Berlin".to_string())
            .parse()
            .map_err(|e| eyre!("Invalid BUSINESS_TIMEZONE value: {}", e))?;
        let open = parse_time(value("BUSINESS_OPEN").as_deref().unwrap_or("09:00"), "BUSINESS_OPEN")?;
        let close = parse_time(value("BUSINESS_CLOSE").as_deref().unwrap_or("17:00"), "BUSINESS_CLOSE")?;
        let weekdays = BusinessHours::parse_weekdays(
            value("BUSINESS_DAYS").as_deref().unwrap_or("mon,tue,wed,thu,fri"),
        )?;
        let business_hours = BusinessHours::new(timezone, open, close, weekdays)?;

        let step = parse_number(value("SLOT_STEP_MINUTES"), 15, "SLOT_STEP_MINUTES")?;
        let duration = parse_number(
            value("APPOINTMENT_DURATION_MINUTES"),
            30,
            "APPOINTMENT_DURATION_MINUTES",
        )?;
        let horizon = parse_number(value("BOOKING_HORIZON_DAYS"), 14, "BOOKING_HORIZON_DAYS")?;
        let slot_params = SlotParams::new(step, duration, horizon)?;

        // Assistant settings
        let defaults = Assistant::default();
        let assistant = Assistant {
            name: value("ASSISTANT_NAME").unwrap_or(defaults.name),
            site: value("ASSISTANT_SITE").unwrap_or(defaults.site),
        };
        let operator_email = value("OPERATOR_EMAIL");

        let integrations = IntegrationsConfig::from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            business_hours,
            slot_params,
            assistant,
            operator_email,
            integrations,
        })
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn parse_time(value: &str, key: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .wrap_err_with(|| format!("Invalid {} value, expected HH:MM", key))
}

fn parse_number<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .parse()
            .wrap_err_with(|| format!("Invalid {} value", key)),
        None => Ok(default),
    }
}
