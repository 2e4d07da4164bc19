use axum::{Router, routing::get};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/calendar", get(handlers::calendar::connect_calendar))
        .route("/callback", get(handlers::calendar::oauth_callback))
}
