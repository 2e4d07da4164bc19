//! # Conversational Field Collector
//!
//! Collects appointment fields one chat turn at a time. The current question
//! is derived from which fields of the [`Draft`] are filled
//! (`Name → Birthdate → Phone → Email → Reason → Slot → Confirm`), and every
//! turn produces an explicit [`Step`]: malformed input yields
//! [`Step::Reprompt`] with the reason instead of silently asking again.

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::errors::{BookingError, BookingResult};
use crate::models::draft::{Draft, Stage};
use crate::validation;

const CANCEL_WORDS: [&str; 5] = ["cancel", "abbrechen", "abbruch", "stop", "quit"];
const YES_WORDS: [&str; 6] = ["yes", "y", "ja", "j", "ok", "okay"];
const NO_WORDS: [&str; 3] = ["no", "n", "nein"];
const BOOKING_WORDS: [&str; 19] = [
    "termin",
    "termine",
    "terminen",
    "termins",
    "terminvereinbarung",
    "appointment",
    "appointments",
    "book",
    "booking",
    "buchen",
    "buche",
    "buchung",
    "reserve",
    "reservation",
    "reservieren",
    "reserviere",
    "reservierung",
    "beratungstermin",
    "besprechungstermin",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Input accepted; ask the next question.
    Prompt(String),
    /// Input rejected for `stage`; `reason` says why.
    Reprompt { stage: Stage, reason: String },
    /// The draft is ready for slot selection and no slots are on offer yet.
    NeedSlots,
    /// The user confirmed the complete draft.
    Confirmed(Draft),
    /// The user abandoned the booking.
    Cancelled,
}

/// Whether a free-form chat message asks for an appointment.
///
/// Only whole words count, so "bookkeeping" or "terminal" do not start a
/// booking.
pub fn wants_booking(message: &str) -> bool {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| BOOKING_WORDS.contains(&word))
}

fn is_cancel(input: &str) -> bool {
    CANCEL_WORDS.contains(&input.to_lowercase().as_str())
}

fn confirmation(input: &str) -> Option<bool> {
    let answer = input
        .trim_end_matches(['.', '!'])
        .to_lowercase();
    if YES_WORDS.contains(&answer.as_str()) {
        Some(true)
    } else if NO_WORDS.contains(&answer.as_str()) {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct FieldCollector {
    timezone: Tz,
}

impl FieldCollector {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn advance(&self, draft: &mut Draft, input: &str, today: NaiveDate) -> Step {
        let input = input.trim();
        if is_cancel(input) {
            return Step::Cancelled;
        }

        let stage = draft.stage();
        let accepted = match stage {
            Stage::Name => validation::split_name(input).map(|(first, last)| {
                draft.first_name = Some(first);
                draft.last_name = Some(last);
            }),
            Stage::Birthdate => {
                validation::parse_birthdate(input, today).map(|date| draft.birthdate = Some(date))
            }
            Stage::Phone => validation::normalize_phone(input).map(|phone| draft.phone = Some(phone)),
            Stage::Email => validation::normalize_email(input).map(|email| draft.email = Some(email)),
            Stage::Reason => validation::check_reason(input).map(|reason| draft.reason = Some(reason)),
            Stage::Slot => {
                if draft.offered.is_empty() {
                    return Step::NeedSlots;
                }
                self.pick_slot(draft, input)
            }
            Stage::Confirm => {
                return match confirmation(input) {
                    Some(true) => Step::Confirmed(draft.clone()),
                    Some(false) => Step::Cancelled,
                    None => Step::Reprompt {
                        stage,
                        reason: "Please answer yes or no.".to_string(),
                    },
                };
            }
        };

        match accepted {
            Ok(()) if draft.stage() == Stage::Slot && draft.offered.is_empty() => Step::NeedSlots,
            Ok(()) => Step::Prompt(self.prompt(draft)),
            Err(BookingError::Validation(reason)) => Step::Reprompt { stage, reason },
            Err(other) => Step::Reprompt {
                stage,
                reason: other.to_string(),
            },
        }
    }

    fn pick_slot(&self, draft: &mut Draft, input: &str) -> BookingResult<()> {
        let count = draft.offered.len();
        let choice = input
            .trim_end_matches('.')
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=count).contains(n))
            .ok_or_else(|| {
                BookingError::Validation(format!("Please reply with a number from 1 to {}.", count))
            })?;
        let slot = draft.offered[choice - 1].clone();
        draft.choose_slot(&slot);
        Ok(())
    }

    pub fn format_local(&self, at: chrono::DateTime<chrono::Utc>) -> String {
        at.with_timezone(&self.timezone)
            .format("%a %d.%m.%Y %H:%M")
            .to_string()
    }

    /// The question for the draft's current stage.
    pub fn prompt(&self, draft: &Draft) -> String {
        match draft.stage() {
            Stage::Name => "What is your first and last name?".to_string(),
            Stage::Birthdate => format!(
                "Thanks, {}. What is your date of birth (DD.MM.YYYY)?",
                draft.first_name.as_deref().unwrap_or_default()
            ),
            Stage::Phone => "What phone number can we reach you at?".to_string(),
            Stage::Email => "What is your email address?".to_string(),
            Stage::Reason => "What is the reason for your visit?".to_string(),
            Stage::Slot if draft.offered.is_empty() => {
                "Let me look up the next free times for you.".to_string()
            }
            Stage::Slot => {
                let mut text = String::from("These times are available:\n");
                for (index, slot) in draft.offered.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", index + 1, self.format_local(slot.start)));
                }
                text.push_str("Please reply with the number of the time you want.");
                text
            }
            Stage::Confirm => format!(
                "Please confirm your appointment:\n\
                 Name: {} {}\nDate of birth: {}\nPhone: {}\nEmail: {}\nReason: {}\nTime: {}\n\
                 Reply yes to book or no to cancel.",
                draft.first_name.as_deref().unwrap_or_default(),
                draft.last_name.as_deref().unwrap_or_default(),
                draft
                    .birthdate
                    .map(|d| d.format("%d.%m.%Y").to_string())
                    .unwrap_or_default(),
                draft.phone.as_deref().unwrap_or_default(),
                draft.email.as_deref().unwrap_or_default(),
                draft.reason.as_deref().unwrap_or_default(),
                draft.start.map(|s| self.format_local(s)).unwrap_or_default(),
            ),
        }
    }

    /// The rejection reason followed by the repeated question.
    pub fn reprompt(&self, draft: &Draft, reason: &str) -> String {
        format!("{} {}", reason, self.prompt(draft))
    }
}
