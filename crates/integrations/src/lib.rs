//! HTTP adapters for the ports in `slotdesk_core::ports`: Microsoft Graph
//! (sign-in, calendar and mail), Azure OpenAI chat completions and Azure
//! Cognitive Search.

pub mod config;
pub mod graph;
pub mod openai;
pub mod search;
pub mod unconfigured;

use std::time::Duration;

use eyre::{Result, WrapErr};
use reqwest::{Client, Response, StatusCode};
use slotdesk_core::errors::{BookingError, BookingResult};
use tracing::warn;

/// Builds the shared outbound client. Connecting may take at most half of
/// the request timeout.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(timeout / 2)
        .timeout(timeout)
        .build()
        .wrap_err("Failed to build HTTP client")
}

pub(crate) fn request_failed(service: &str, err: reqwest::Error) -> BookingError {
    BookingError::Upstream(format!("{} request failed: {}", service, err))
}

/// Passes successful responses through and turns the rest into errors.
/// Rejected credentials are a configuration problem, everything else is
/// reported as an upstream failure.
pub(crate) async fn check_status(service: &str, response: Response) -> BookingResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("{} returned {}: {}", service, status, body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BookingError::Configuration(format!(
            "{} rejected the configured credentials ({})",
            service, status
        )),
        _ => BookingError::Upstream(format!("{} returned {}", service, status)),
    })
}
