use axum::http::StatusCode;
use rstest::rstest;
use slotdesk_api::middleware::error_handling::{AppError, map_error};
use slotdesk_core::errors::BookingError;

#[rstest]
#[case(BookingError::NotFound("Appointment".to_string()), StatusCode::NOT_FOUND)]
#[case(BookingError::Validation("Invalid input".to_string()), StatusCode::BAD_REQUEST)]
#[case(BookingError::Conflict("Slot taken".to_string()), StatusCode::CONFLICT)]
#[case(BookingError::Authentication("Bad state".to_string()), StatusCode::UNAUTHORIZED)]
#[case(
    BookingError::Configuration("Calendar not connected".to_string()),
    StatusCode::SERVICE_UNAVAILABLE
)]
#[case(BookingError::Upstream("Graph returned 500".to_string()), StatusCode::BAD_GATEWAY)]
#[case(BookingError::Database(eyre::eyre!("Database error")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_error_status_mapping(#[case] error: BookingError, #[case] expected: StatusCode) {
    let response = map_error(error);

    assert_eq!(response.status(), expected);
}

#[test]
fn test_error_handling_internal() {
    let error = BookingError::Internal(Box::new(std::io::Error::other("Internal error")));

    let response = map_error(error);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_report_converts_to_database_error() {
    let error = AppError::from(eyre::eyre!("connection refused"));

    assert!(matches!(error.0, BookingError::Database(_)));
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
