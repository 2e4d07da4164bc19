use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotdesk_core::{conversation::knowledge::NO_CONTEXT_REPLY, errors::BookingError};
use uuid::Uuid;

use crate::test_utils::TestContext;

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.drafts.expect_load().never();
    ctx.model.expect_complete().never();
    let server = ctx.server();

    let response = server.post("/chat").json(&json!({ "message": "   " })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("No question received"));
}

#[tokio::test]
async fn test_knowledge_answer_is_rendered() {
    let mut ctx = TestContext::new();
    ctx.drafts
        .expect_load()
        .withf(|session_id| session_id == "session-1")
        .returning(|_| Ok(None));
    ctx.search
        .expect_search()
        .times(1)
        .returning(|_, _| Ok(vec!["Wir entwickeln Webseiten und Apps.".to_string()]));
    ctx.model
        .expect_complete()
        .times(1)
        .returning(|_, _| Ok("We build **websites** and apps.".to_string()));
    let server = ctx.server();

    let response = server
        .post("/chat")
        .add_header(
            HeaderName::from_static("x-session-id"),
            HeaderValue::from_static("session-1"),
        )
        .json(&json!({ "message": "What do you offer?" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["session_id"], "session-1");
    assert_eq!(body["response"], "We build **websites** and apps.");
    assert!(
        body["reply_html"]
            .as_str()
            .unwrap()
            .contains("<strong>websites</strong>")
    );
}

#[tokio::test]
async fn test_body_session_id_wins_over_header() {
    let mut ctx = TestContext::new();
    ctx.drafts
        .expect_load()
        .withf(|session_id| session_id == "from-body")
        .returning(|_| Ok(None));
    ctx.search.expect_search().returning(|_, _| Ok(Vec::new()));
    ctx.model.expect_complete().never();
    let server = ctx.server();

    let response = server
        .post("/chat")
        .add_header(
            HeaderName::from_static("x-session-id"),
            HeaderValue::from_static("from-header"),
        )
        .json(&json!({ "message": "Hello", "session_id": "from-body" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["session_id"], "from-body");
    assert_eq!(body["response"], NO_CONTEXT_REPLY);
    assert!(body.get("reply_html").is_none());
}

#[tokio::test]
async fn test_booking_intent_starts_draft() {
    let mut ctx = TestContext::new();
    ctx.drafts.expect_load().returning(|_| Ok(None));
    ctx.drafts.expect_save().times(1).returning(|_, _| Ok(()));
    ctx.search.expect_search().never();
    let server = ctx.server();

    let response = server
        .post("/chat")
        .json(&json!({ "message": "Ich möchte einen Termin buchen" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(Uuid::parse_str(body["session_id"].as_str().unwrap()).is_ok());
    assert!(
        body["response"]
            .as_str()
            .unwrap()
            .contains("first and last name")
    );
}

#[tokio::test]
async fn test_unconfigured_model_is_unavailable() {
    let mut ctx = TestContext::new();
    ctx.drafts.expect_load().returning(|_| Ok(None));
    ctx.search
        .expect_search()
        .returning(|_, _| Ok(vec!["Kontext".to_string()]));
    ctx.model.expect_complete().returning(|_, _| {
        Err(BookingError::Configuration(
            "Azure OpenAI is not configured".to_string(),
        ))
    });
    let server = ctx.server();

    let response = server
        .post("/chat")
        .json(&json!({ "message": "What do you offer?" }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = TestContext::new().server();

    let response = server
        .post("/chat")
        .json(&json!({ "message": 42 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
