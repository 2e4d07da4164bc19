//! # Availability Handler
//!
//! Lists free appointment slots. Candidates are generated from the business
//! hours and filtered against the remote calendar and stored bookings by
//! [`AvailabilityFinder`](slotdesk_core::scheduling::availability::AvailabilityFinder).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use slotdesk_core::{
    models::slot::{AvailableTimesQuery, Slot},
    scheduling::slots::SlotParams,
};

use crate::{ApiState, middleware::error_handling::AppError};

/// Handles `GET /available-times?days=&duration=&step=`
///
/// Missing parameters fall back to the configured slot grid. The horizon is
/// clamped to one year.
///
/// # Errors
///
/// * `BookingError::Validation` - Duration or step out of range
/// * `BookingError::Upstream` - The calendar could not be queried
#[axum::debug_handler]
pub async fn available_times(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let params = slot_params(state.availability.defaults(), &query)?;
    let slots = state.availability.find(&params, Utc::now()).await?;
    Ok(Json(slots))
}

fn slot_params(defaults: &SlotParams, query: &AvailableTimesQuery) -> Result<SlotParams, AppError> {
    let params = SlotParams::new(
        query.step.unwrap_or_else(|| defaults.step.num_minutes()),
        query
            .duration
            .unwrap_or_else(|| defaults.duration.num_minutes()),
        query.days.unwrap_or(defaults.horizon_days),
    )?;
    Ok(params)
}
