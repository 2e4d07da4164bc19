//! # Chat Handler
//!
//! One chat turn: the message goes to the [`ChatDesk`], which either drives
//! the appointment collector or answers from the knowledge index. Model
//! answers are returned as Markdown and as rendered HTML.
//!
//! [`ChatDesk`]: slotdesk_core::conversation::desk::ChatDesk

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use chrono::Utc;
use pulldown_cmark::{Event, Options, Parser, html};
use slotdesk_core::{
    errors::BookingError,
    models::chat::{ChatRequest, ChatResponse},
};
use tracing::debug;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

pub const SESSION_HEADER: &str = "x-session-id";

/// Handles `POST /chat`
///
/// The session id is taken from the body, then from the `x-session-id`
/// header. A new session id is generated when neither is present and
/// returned so the client can continue the conversation.
///
/// # Errors
///
/// * `BookingError::Validation` - Empty message or malformed JSON body
/// * `BookingError::Upstream` - The search index or language model failed
/// * `BookingError::Configuration` - The language model is not configured
#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) =
        payload.map_err(|rejection| BookingError::Validation(rejection.body_text()))?;

    let session_id = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| header_value(&headers, SESSION_HEADER))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    debug!("Chat turn for session {}", session_id);

    let reply = state
        .desk
        .handle(&session_id, &request.message, Utc::now())
        .await?;
    let reply_html = reply.markdown.then(|| render_markdown(&reply.text));

    Ok(Json(ChatResponse {
        response: reply.text,
        reply_html,
        session_id,
    }))
}

pub(crate) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Renders model output to HTML. Raw HTML in the input is escaped, not passed
/// through.
pub fn render_markdown(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut rendered = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}
