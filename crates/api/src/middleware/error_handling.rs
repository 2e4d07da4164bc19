//! # Error Handling Middleware
//!
//! Maps [`BookingError`] values to HTTP status codes and a JSON body of the
//! form `{"status": "error", "error": "..."}`, so every endpoint fails the
//! same way.
//!
//! | Error            | Status |
//! |------------------|--------|
//! | `NotFound`       | 404    |
//! | `Validation`     | 400    |
//! | `Conflict`       | 409    |
//! | `Authentication` | 401    |
//! | `Configuration`  | 503    |
//! | `Upstream`       | 502    |
//! | `Database`, `Internal` | 500 |
//!
//! Server errors are logged at `error` level except transient upstream
//! failures, which are logged as warnings like client errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use slotdesk_core::errors::BookingError;
use tracing::{Level, error, warn};

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use slotdesk_api::middleware::error_handling::AppError;
/// use slotdesk_core::errors::BookingError;
///
/// async fn handler(id: String) -> Result<Json<String>, AppError> {
///     if id.is_empty() {
///         return Err(AppError(BookingError::Validation("Missing id".to_string())));
///     }
///     Ok(Json(id))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Authentication(_) => StatusCode::UNAUTHORIZED,
            BookingError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Upstream(_) => StatusCode::BAD_GATEWAY,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn log_level(&self) -> Level {
        if self.status().is_server_error() && !self.0.is_transient() {
            Level::ERROR
        } else {
            Level::WARN
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();
        if self.log_level() == Level::ERROR {
            error!("Request failed with {}: {}", status, message);
        } else {
            warn!("Request rejected with {}: {}", status, message);
        }

        let body = Json(json!({ "status": "error", "error": message }));
        (status, body).into_response()
    }
}

/// Automatic conversion from BookingError to AppError
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Reports come from the repository layer and are wrapped as
/// [`BookingError::Database`].
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(BookingError::Database(err))
    }
}

/// Maps a BookingError to an HTTP response
///
/// # Example
///
/// ```
/// use axum::http::StatusCode;
/// use slotdesk_api::middleware::error_handling::map_error;
/// use slotdesk_core::errors::BookingError;
///
/// let response = map_error(BookingError::Conflict("Slot taken".to_string()));
/// assert_eq!(response.status(), StatusCode::CONFLICT);
/// ```
pub fn map_error(err: BookingError) -> Response {
    AppError(err).into_response()
}
