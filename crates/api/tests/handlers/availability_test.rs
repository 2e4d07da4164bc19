use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::Value;
use slotdesk_core::{
    errors::BookingError,
    models::slot::{BusyInterval, Slot},
};

use crate::test_utils::TestContext;

fn free_calendar(ctx: &mut TestContext) {
    ctx.calendar
        .expect_busy_intervals()
        .returning(|_, _| Ok(Vec::new()));
}

#[tokio::test]
async fn test_available_times_lists_free_slots() {
    let mut ctx = TestContext::new();
    free_calendar(&mut ctx);
    ctx.store
        .expect_booked_intervals()
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    let server = ctx.server();

    let response = server
        .get("/available-times")
        .add_query_param("days", 7)
        .add_query_param("duration", 60)
        .await;

    response.assert_status_ok();
    let slots = response.json::<Vec<Slot>>();
    assert!(!slots.is_empty());
    for slot in &slots {
        assert_eq!(slot.duration(), Duration::minutes(60));
        assert!(slot.id.ends_with("-60"));
    }
    assert!(slots.windows(2).all(|pair| pair[0].start < pair[1].start));
}

#[tokio::test]
async fn test_stored_bookings_are_subtracted() {
    let mut ctx = TestContext::new();
    free_calendar(&mut ctx);
    // Everything in the window is already booked.
    ctx.store
        .expect_booked_intervals()
        .returning(|start, end| Ok(vec![BusyInterval::new(start, end)]));
    let server = ctx.server();

    let response = server.get("/available-times").add_query_param("days", 7).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Vec<Slot>>(), Vec::new());
}

#[tokio::test]
async fn test_invalid_duration_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.calendar.expect_busy_intervals().never();
    let server = ctx.server();

    let response = server
        .get("/available-times")
        .add_query_param("duration", 0)
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("duration"));
}

#[tokio::test]
async fn test_oversized_duration_and_step_are_rejected() {
    let mut ctx = TestContext::new();
    ctx.calendar.expect_busy_intervals().never();
    ctx.store.expect_booked_intervals().never();
    let server = ctx.server();

    let response = server
        .get("/available-times")
        .add_query_param("duration", i64::MAX)
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("duration"));

    let response = server
        .get("/available-times")
        .add_query_param("step", i64::MAX)
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("step"));
}

#[tokio::test]
async fn test_calendar_failure_is_bad_gateway() {
    let mut ctx = TestContext::new();
    ctx.calendar.expect_busy_intervals().returning(|_, _| {
        Err(BookingError::Upstream(
            "Microsoft Graph returned 500".to_string(),
        ))
    });
    let server = ctx.server();

    let response = server.get("/available-times").add_query_param("days", 7).await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
}
