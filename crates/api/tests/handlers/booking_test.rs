use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;
use slotdesk_core::{
    errors::BookingError,
    models::{
        appointment::{AppointmentStatus, NotificationStatus},
        slot::BusyInterval,
    },
};
use uuid::Uuid;

use crate::test_utils::{self, OPERATOR, TestContext};

fn idempotency(key: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("idempotency-key"),
        HeaderValue::from_static(key),
    )
}

/// Expectations for a booking that goes through every step.
fn accept_booking(ctx: &mut TestContext, key: &'static str) {
    ctx.store
        .expect_find_by_idempotency_key()
        .withf(move |k| k == key)
        .times(1)
        .returning(|_| Ok(None));
    ctx.calendar
        .expect_busy_intervals()
        .returning(|_, _| Ok(Vec::new()));
    ctx.store
        .expect_reserve()
        .times(1)
        .returning(|new| Ok(test_utils::stored(new, AppointmentStatus::Pending, None)));
    ctx.calendar
        .expect_create_event()
        .times(1)
        .returning(|_| Ok("evt-7".to_string()));
    ctx.store.expect_confirm().times(1).returning(move |id, event_id| {
        let mut appointment = test_utils::confirmed_appointment(test_utils::next_monday_morning(), key);
        appointment.id = id;
        appointment.calendar_event_id = Some(event_id.to_string());
        Ok(appointment)
    });
    ctx.store
        .expect_set_notification_status()
        .times(1)
        .returning(|_, _| Ok(()));
}

#[tokio::test]
async fn test_book_appointment_created() {
    let mut ctx = TestContext::new();
    accept_booking(&mut ctx, "key-1");
    ctx.mailer.expect_send().times(2).returning(|_| Ok(()));
    let server = ctx.server();

    let (name, value) = idempotency("key-1");
    let response = server
        .post("/book")
        .add_header(name, value)
        .json(&test_utils::booking_body(test_utils::next_monday_morning()))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["notification_sent"], true);
    assert!(Uuid::parse_str(body["appointment_id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_body_idempotency_key_is_used() {
    let mut ctx = TestContext::new();
    accept_booking(&mut ctx, "body-key");
    ctx.mailer.expect_send().times(2).returning(|_| Ok(()));
    let server = ctx.server();

    let mut body = test_utils::booking_body(test_utils::next_monday_morning());
    body["idempotency_key"] = Value::from("body-key");
    let response = server.post("/book-appointment").json(&body).await;

    response.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_mail_failure_is_reported() {
    let mut ctx = TestContext::new();
    accept_booking(&mut ctx, "key-2");
    ctx.mailer
        .expect_send()
        .withf(|mail| mail.to == vec![OPERATOR.to_string()])
        .returning(|_| Err(BookingError::Upstream("Mail rejected".to_string())));
    ctx.mailer
        .expect_send()
        .returning(|_| Ok(()));
    let server = ctx.server();

    let (name, value) = idempotency("key-2");
    let response = server
        .post("/book")
        .add_header(name, value)
        .json(&test_utils::booking_body(test_utils::next_monday_morning()))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["notification_sent"], false);
    assert!(body["message"].as_str().unwrap().contains("could not be sent"));
}

#[tokio::test]
async fn test_repeated_key_replays_booking() {
    let start = test_utils::next_monday_morning();
    let mut existing = test_utils::confirmed_appointment(start, "key-1");
    existing.notification_status = NotificationStatus::Sent;
    let existing_id = existing.id;

    let mut ctx = TestContext::new();
    ctx.store
        .expect_find_by_idempotency_key()
        .returning(move |_| Ok(Some(existing.clone())));
    ctx.store.expect_reserve().never();
    ctx.calendar.expect_create_event().never();
    ctx.mailer.expect_send().never();
    let server = ctx.server();

    let (name, value) = idempotency("key-1");
    let response = server
        .post("/book")
        .add_header(name, value)
        .json(&test_utils::booking_body(start))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["appointment_id"], existing_id.to_string());
    assert_eq!(body["message"], "Appointment was already booked");
}

#[tokio::test]
async fn test_busy_calendar_is_conflict() {
    let mut ctx = TestContext::new();
    ctx.store
        .expect_find_by_idempotency_key()
        .returning(|_| Ok(None));
    ctx.calendar
        .expect_busy_intervals()
        .returning(|start, end| Ok(vec![BusyInterval::new(start, end)]));
    ctx.store.expect_reserve().never();
    let server = ctx.server();

    let response = server
        .post("/book")
        .json(&test_utils::booking_body(test_utils::next_monday_morning()))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["status"], "error");
}

#[tokio::test]
async fn test_invalid_fields_are_rejected() {
    let mut ctx = TestContext::new();
    ctx.store.expect_find_by_idempotency_key().never();
    let server = ctx.server();

    let mut body = test_utils::booking_body(test_utils::next_monday_morning());
    body["email"] = Value::from("not-an-email");
    let response = server.post("/book").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/book")
        .json(&serde_json::json!({ "first_name": "Anna" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_form_lists_slots() {
    let mut ctx = TestContext::new();
    ctx.calendar
        .expect_busy_intervals()
        .returning(|_, _| Ok(Vec::new()));
    ctx.store
        .expect_booked_intervals()
        .returning(|_, _| Ok(Vec::new()));
    let server = ctx.server();

    let response = server.get("/book").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["duration_minutes"], 30);
    assert_eq!(body["required_fields"].as_array().unwrap().len(), 7);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), slotdesk_api::handlers::booking::FORM_SLOT_LIMIT);
}

#[tokio::test]
async fn test_get_appointment() {
    let appointment = test_utils::confirmed_appointment(test_utils::next_monday_morning(), "key-1");
    let id = appointment.id;

    let mut ctx = TestContext::new();
    ctx.store
        .expect_get()
        .withf(move |requested| *requested == id)
        .returning(move |_| Ok(Some(appointment.clone())));
    let server = ctx.server();

    let response = server.get(&format!("/appointments/{}", id)).await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["status"], "confirmed");
}

#[tokio::test]
async fn test_get_unknown_appointment() {
    let mut ctx = TestContext::new();
    ctx.store.expect_get().returning(|_| Ok(None));
    let server = ctx.server();

    let response = server
        .get(&format!("/appointments/{}", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_appointment() {
    let appointment = test_utils::confirmed_appointment(test_utils::next_monday_morning(), "key-1");
    let id = appointment.id;

    let mut ctx = TestContext::new();
    ctx.store
        .expect_get()
        .returning(move |_| Ok(Some(appointment.clone())));
    ctx.calendar
        .expect_delete_event()
        .withf(|event_id| event_id == "evt-1")
        .times(1)
        .returning(|_| Ok(()));
    ctx.store
        .expect_delete()
        .withf(move |deleted| *deleted == id)
        .times(1)
        .returning(|_| Ok(true));
    ctx.mailer.expect_send().times(1).returning(|_| Ok(()));
    let server = ctx.server();

    let response = server.delete(&format!("/appointments/{}", id)).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}
