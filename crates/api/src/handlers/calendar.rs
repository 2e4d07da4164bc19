//! # Calendar Connection Handlers
//!
//! Connects the business calendar by signing in to Microsoft once. The
//! resulting token is persisted and refreshed automatically afterwards.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use slotdesk_core::{
    errors::BookingError, models::appointment::StatusResponse, ports::IdentityProvider,
};
use tracing::{info, warn};

use crate::{ApiState, middleware::error_handling::AppError};

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn identity(state: &ApiState) -> Result<&Arc<dyn IdentityProvider>, AppError> {
    state.identity.as_ref().ok_or_else(|| {
        AppError(BookingError::Configuration(
            "Microsoft sign-in is not configured".to_string(),
        ))
    })
}

/// Handles `GET /calendar`: redirects the browser to the Microsoft sign-in
/// page with a fresh anti-forgery state.
#[axum::debug_handler]
pub async fn connect_calendar(State(state): State<Arc<ApiState>>) -> Result<Redirect, AppError> {
    let provider = identity(&state)?;
    let oauth_state = state.oauth_states.issue();
    Ok(Redirect::temporary(&provider.authorize_url(&oauth_state)))
}

/// Handles `GET /callback?code=&state=`
///
/// # Errors
///
/// * `BookingError::Authentication` - Sign-in was denied, or the state is unknown or expired
/// * `BookingError::Validation` - No code in the callback
/// * `BookingError::Configuration` - Sign-in is not configured
#[axum::debug_handler]
pub async fn oauth_callback(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let provider = identity(&state)?;

    if let Some(error) = query.error {
        warn!("Microsoft sign-in returned {}", error);
        return Err(AppError(BookingError::Authentication(format!(
            "Sign-in failed: {}",
            query.error_description.unwrap_or(error)
        ))));
    }

    let oauth_state = query.state.unwrap_or_default();
    if !state.oauth_states.consume(&oauth_state) {
        return Err(AppError(BookingError::Authentication(
            "Unknown or expired sign-in state".to_string(),
        )));
    }

    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| BookingError::Validation("Missing authorization code".to_string()))?;

    let token = provider.exchange_code(&code).await?;
    state.tokens.save(&token).await?;
    info!("Calendar connected for provider {}", token.provider);

    Ok(Json(StatusResponse::ok("Calendar connected")))
}
