//! # Chat Desk
//!
//! Routes one chat turn either into the appointment collector or to the
//! knowledge answer. A session is in booking mode while a draft exists for
//! it; a new draft is started when the message asks for an appointment.
//! Drafts are persisted after every turn, so a conversation survives
//! restarts and can be served by any worker.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::collector::{FieldCollector, Step, wants_booking};
use super::knowledge::{self, Assistant};
use crate::errors::{BookingError, BookingResult};
use crate::models::draft::Draft;
use crate::ports::{ChatModel, DraftStore, KnowledgeSearch};
use crate::scheduling::{availability::AvailabilityFinder, booking::BookingWriter};

/// Number of free slots offered in one chat message.
pub const MAX_OFFERED_SLOTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    /// The text is model output and may contain Markdown.
    pub markdown: bool,
}

impl ChatReply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
        }
    }
}

pub struct ChatDesk {
    drafts: Arc<dyn DraftStore>,
    booking: Arc<BookingWriter>,
    availability: Arc<AvailabilityFinder>,
    search: Arc<dyn KnowledgeSearch>,
    model: Arc<dyn ChatModel>,
    collector: FieldCollector,
    assistant: Assistant,
}

impl ChatDesk {
    pub fn new(
        drafts: Arc<dyn DraftStore>,
        booking: Arc<BookingWriter>,
        availability: Arc<AvailabilityFinder>,
        search: Arc<dyn KnowledgeSearch>,
        model: Arc<dyn ChatModel>,
        assistant: Assistant,
    ) -> Self {
        let collector = FieldCollector::new(availability.hours().timezone);
        Self {
            drafts,
            booking,
            availability,
            search,
            model,
            collector,
            assistant,
        }
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub async fn handle(
        &self,
        session_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> BookingResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(BookingError::Validation("No question received".to_string()));
        }

        if let Some(draft) = self.drafts.load(session_id).await? {
            return self.continue_booking(session_id, draft, message, now).await;
        }

        if wants_booking(message) {
            info!("Starting appointment draft for session {}", session_id);
            let draft = Draft::default();
            self.drafts.save(session_id, &draft).await?;
            return Ok(ChatReply::plain(format!(
                "Happy to book an appointment for you. You can type \"cancel\" at any time. {}",
                self.collector.prompt(&draft)
            )));
        }

        let answer =
            knowledge::answer(self.search.as_ref(), self.model.as_ref(), &self.assistant, message)
                .await?;
        Ok(ChatReply {
            text: answer.text,
            markdown: answer.from_model,
        })
    }

    async fn continue_booking(
        &self,
        session_id: &str,
        mut draft: Draft,
        message: &str,
        now: DateTime<Utc>,
    ) -> BookingResult<ChatReply> {
        match self.collector.advance(&mut draft, message, now.date_naive()) {
            Step::Prompt(text) => {
                self.drafts.save(session_id, &draft).await?;
                Ok(ChatReply::plain(text))
            }
            Step::Reprompt { stage, reason } => {
                info!("Session {} re-prompted at {:?}: {}", session_id, stage, reason);
                Ok(ChatReply::plain(self.collector.reprompt(&draft, &reason)))
            }
            Step::NeedSlots => self.offer_slots(session_id, draft, now, None).await,
            Step::Confirmed(confirmed) => self.finish(session_id, confirmed, now).await,
            Step::Cancelled => {
                self.drafts.discard(session_id).await?;
                info!("Session {} cancelled its appointment draft", session_id);
                Ok(ChatReply::plain(
                    "Okay, I have cancelled the booking. How else can I help you?",
                ))
            }
        }
    }

    async fn offer_slots(
        &self,
        session_id: &str,
        mut draft: Draft,
        now: DateTime<Utc>,
        preface: Option<&str>,
    ) -> BookingResult<ChatReply> {
        let mut slots = self.availability.find_default(now).await?;
        slots.truncate(MAX_OFFERED_SLOTS);

        if slots.is_empty() {
            self.drafts.discard(session_id).await?;
            return Ok(ChatReply::plain(
                "Sorry, there are no free appointments in the coming days. Please contact us directly.",
            ));
        }

        draft.clear_slot();
        draft.offered = slots;
        self.drafts.save(session_id, &draft).await?;

        let prompt = self.collector.prompt(&draft);
        Ok(ChatReply::plain(match preface {
            Some(preface) => format!("{} {}", preface, prompt),
            None => prompt,
        }))
    }

    async fn finish(
        &self,
        session_id: &str,
        draft: Draft,
        now: DateTime<Utc>,
    ) -> BookingResult<ChatReply> {
        let Some(request) = draft.to_request() else {
            // Stage is Confirm only when every field is present.
            return Err(BookingError::Validation(
                "The appointment details are incomplete".to_string(),
            ));
        };
        let key = format!("chat:{}:{}", session_id, request.start.timestamp());

        match self.booking.book(request, key, now).await {
            Ok(outcome) => {
                self.drafts.discard(session_id).await?;
                let when = self.collector.format_local(outcome.appointment.start);
                let text = if outcome.notification_sent {
                    format!(
                        "Your appointment on {} is booked. A confirmation has been sent to {}.",
                        when, outcome.appointment.email
                    )
                } else {
                    format!(
                        "Your appointment on {} is booked, but the confirmation email could not be sent.",
                        when
                    )
                };
                Ok(ChatReply::plain(text))
            }
            Err(BookingError::Conflict(reason)) => {
                warn!("Chat booking for session {} conflicted: {}", session_id, reason);
                self.offer_slots(
                    session_id,
                    draft,
                    now,
                    Some("Sorry, that time was just taken."),
                )
                .await
            }
            // Contact fields were validated while collecting, so this is the
            // chosen time having gone stale (past or outside business hours).
            Err(BookingError::Validation(reason)) => {
                warn!("Chat booking for session {} was rejected: {}", session_id, reason);
                self.offer_slots(
                    session_id,
                    draft,
                    now,
                    Some("Sorry, that time can no longer be booked."),
                )
                .await
            }
            Err(err) => Err(err),
        }
    }
}
