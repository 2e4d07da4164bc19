use axum::{Router, routing::get};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/book",
            get(handlers::booking::booking_form).post(handlers::booking::book_appointment),
        )
        .route(
            "/book-appointment",
            get(handlers::booking::booking_form).post(handlers::booking::book_appointment),
        )
        .route(
            "/appointments/:id",
            get(handlers::booking::get_appointment).delete(handlers::booking::cancel_appointment),
        )
}
