use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::Value;
use slotdesk_core::{models::token::OAuthToken, ports::MockIdentityProvider};

use crate::test_utils::TestContext;

fn identity() -> MockIdentityProvider {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_authorize_url()
        .returning(|state| format!("https://login.example.com/authorize?state={}", state));
    identity
}

fn state_from(location: &str) -> String {
    location
        .split("state=")
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_calendar_without_sign_in_configured() {
    let server = TestContext::new().server();

    let response = server.get("/calendar").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sign_in_round_trip() {
    let mut ctx = TestContext::new();
    let mut provider = identity();
    provider
        .expect_exchange_code()
        .withf(|code| code == "code-1")
        .times(1)
        .returning(|_| {
            Ok(OAuthToken {
                provider: "microsoft".to_string(),
                access_token: "at".to_string(),
                refresh_token: Some("rt".to_string()),
                expires_at: Utc::now() + Duration::hours(1),
                updated_at: Utc::now(),
            })
        });
    ctx.identity = Some(provider);
    ctx.tokens
        .expect_save()
        .withf(|token| token.refresh_token.as_deref() == Some("rt"))
        .times(1)
        .returning(|_| Ok(()));
    let server = ctx.server();

    let redirect = server.get("/calendar").await;
    redirect.assert_status(StatusCode::TEMPORARY_REDIRECT);
    let location = redirect.header("location");
    let state = state_from(location.to_str().unwrap());
    assert_eq!(state.len(), 32);

    let response = server
        .get("/callback")
        .add_query_param("code", "code-1")
        .add_query_param("state", &state)
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");

    // States are single use.
    let replay = server
        .get("/callback")
        .add_query_param("code", "code-1")
        .add_query_param("state", &state)
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_with_unknown_state() {
    let mut ctx = TestContext::new();
    let mut provider = identity();
    provider.expect_exchange_code().never();
    ctx.identity = Some(provider);
    ctx.tokens.expect_save().never();
    let server = ctx.server();

    let response = server
        .get("/callback")
        .add_query_param("code", "code-1")
        .add_query_param("state", "forged")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let mut ctx = TestContext::new();
    ctx.identity = Some(identity());
    let server = ctx.server();

    let response = server
        .get("/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("error_description", "The user declined")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("The user declined"));
}
