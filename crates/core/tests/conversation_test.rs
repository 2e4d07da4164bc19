use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use slotdesk_core::conversation::{
    collector::{FieldCollector, Step, wants_booking},
    desk::ChatDesk,
    knowledge::{self, Assistant, NO_CONTEXT_REPLY},
    persona::{Tone, detect_tone},
};
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::models::{
    appointment::AppointmentStatus,
    draft::{Draft, Stage},
    slot::Slot,
};
use slotdesk_core::ports::{
    DraftStore, MockAppointmentStore, MockCalendarService, MockChatModel, MockKnowledgeSearch,
    MockMailer,
};
use slotdesk_core::scheduling::{
    availability::AvailabilityFinder, booking::BookingWriter, hours::BusinessHours,
    slots::SlotParams,
};

mod common;

#[derive(Default)]
struct MemoryDrafts {
    drafts: Mutex<HashMap<String, Draft>>,
}

impl MemoryDrafts {
    fn get(&self, session_id: &str) -> Option<Draft> {
        self.drafts.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl DraftStore for MemoryDrafts {
    async fn load(&self, session_id: &str) -> BookingResult<Option<Draft>> {
        Ok(self.get(session_id))
    }

    async fn save(&self, session_id: &str, draft: &Draft) -> BookingResult<()> {
        self.drafts
            .lock()
            .unwrap()
            .insert(session_id.to_string(), draft.clone());
        Ok(())
    }

    async fn discard(&self, session_id: &str) -> BookingResult<()> {
        self.drafts.lock().unwrap().remove(session_id);
        Ok(())
    }
}

fn today() -> NaiveDate {
    common::now().date_naive()
}

fn collector() -> FieldCollector {
    FieldCollector::new(chrono_tz::Europe::Berlin)
}

#[rstest]
#[case("Ich möchte einen Termin vereinbaren", true)]
#[case("Can I book a visit?", true)]
#[case("I need an appointment", true)]
#[case("Reservierung bitte", true)]
#[case("What services do you offer?", false)]
#[case("Was kostet eine Website?", false)]
#[case("Do you offer bookkeeping software?", false)]
#[case("Is your terminal server down?", false)]
#[case("Can you explain the terminology?", false)]
#[case("I added a bookmark to your site", false)]
#[case("Ich brauche eine Terminvereinbarung", true)]
#[case("BOOKING please", true)]
fn test_wants_booking(#[case] message: &str, #[case] expected: bool) {
    assert_eq!(wants_booking(message), expected);
}

#[rstest]
#[case("Was bieten Sie an?", Tone::Formal)]
#[case("Kannst du mir sagen, was ihr macht?", Tone::Informal)]
#[case("What do you offer?", Tone::Neutral)]
fn test_detect_tone(#[case] message: &str, #[case] expected: Tone) {
    assert_eq!(detect_tone(message), expected);
}

#[test]
fn test_collector_walks_through_fields() {
    let collector = collector();
    let mut draft = Draft::default();

    let step = collector.advance(&mut draft, "Anna Maria Schmidt", today());
    assert!(matches!(step, Step::Prompt(ref text) if text.contains("date of birth")));
    assert_eq!(draft.first_name.as_deref(), Some("Anna"));
    assert_eq!(draft.last_name.as_deref(), Some("Maria Schmidt"));

    collector.advance(&mut draft, "01.03.1990", today());
    assert_eq!(draft.birthdate, NaiveDate::from_ymd_opt(1990, 3, 1));

    collector.advance(&mut draft, " +49  170 1234567 ", today());
    assert_eq!(draft.phone.as_deref(), Some("+49 170 1234567"));

    collector.advance(&mut draft, "Anna@Example.COM", today());
    assert_eq!(draft.email.as_deref(), Some("anna@example.com"));

    let step = collector.advance(&mut draft, "Check-up", today());
    assert_eq!(step, Step::NeedSlots);
    assert_eq!(draft.stage(), Stage::Slot);
}

#[test]
fn test_collector_reprompts_invalid_input() {
    let collector = collector();
    let mut draft = Draft::default();

    let step = collector.advance(&mut draft, "Anna", today());
    assert!(matches!(step, Step::Reprompt { stage: Stage::Name, .. }));
    assert_eq!(draft, Draft::default());

    collector.advance(&mut draft, "Anna Schmidt", today());
    let step = collector.advance(&mut draft, "31.12.2099", today());
    match step {
        Step::Reprompt { stage, reason } => {
            assert_eq!(stage, Stage::Birthdate);
            assert!(reason.contains("past"));
        }
        other => panic!("expected reprompt, got {:?}", other),
    }
    assert_eq!(draft.birthdate, None);
}

#[test]
fn test_collector_slot_choice_and_confirmation() {
    let collector = collector();
    let start = common::monday_morning();
    let slots = vec![
        Slot::new(start, start + Duration::minutes(30)),
        Slot::new(start + Duration::minutes(15), start + Duration::minutes(45)),
    ];
    let mut draft = Draft {
        first_name: Some("Anna".to_string()),
        last_name: Some("Schmidt".to_string()),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 1),
        phone: Some("0301234567".to_string()),
        email: Some("anna@example.com".to_string()),
        reason: Some("Check-up".to_string()),
        offered: slots.clone(),
        ..Draft::default()
    };

    let prompt = collector.prompt(&draft);
    assert!(prompt.contains("1. Mon 19.10.2026 09:00"));
    assert!(prompt.contains("2. Mon 19.10.2026 09:15"));

    let step = collector.advance(&mut draft, "3", today());
    assert!(matches!(step, Step::Reprompt { stage: Stage::Slot, .. }));

    let step = collector.advance(&mut draft, "2", today());
    assert!(matches!(step, Step::Prompt(ref text) if text.contains("Please confirm")));
    assert_eq!(draft.start, Some(slots[1].start));

    let step = collector.advance(&mut draft, "maybe", today());
    assert!(matches!(step, Step::Reprompt { stage: Stage::Confirm, .. }));

    let step = collector.advance(&mut draft, "Ja!", today());
    assert_eq!(step, Step::Confirmed(draft.clone()));
}

#[rstest]
#[case("cancel")]
#[case("Abbrechen")]
fn test_collector_cancel_at_any_stage(#[case] input: &str) {
    let mut draft = Draft {
        first_name: Some("Anna".to_string()),
        last_name: Some("Schmidt".to_string()),
        ..Draft::default()
    };

    assert_eq!(collector().advance(&mut draft, input, today()), Step::Cancelled);
}

#[tokio::test]
async fn test_knowledge_without_context_skips_model() {
    let mut search = MockKnowledgeSearch::new();
    search
        .expect_search()
        .withf(|_, top| *top == 6)
        .returning(|_, _| Ok(vec!["   ".to_string()]));
    let mut model = MockChatModel::new();
    model.expect_complete().never();

    let answer = knowledge::answer(&search, &model, &Assistant::default(), "Wer seid ihr?")
        .await
        .unwrap();

    assert_eq!(answer.text, NO_CONTEXT_REPLY);
    assert!(!answer.from_model);
}

#[tokio::test]
async fn test_knowledge_passes_context_to_model() {
    let mut search = MockKnowledgeSearch::new();
    search.expect_search().returning(|_, _| {
        Ok(vec![
            "IT-Land baut Websites.".to_string(),
            "Wir bieten Hosting an.".to_string(),
        ])
    });
    let mut model = MockChatModel::new();
    model
        .expect_complete()
        .withf(|system, user| {
            system.contains("LandKI")
                && system.contains("Sie-Form")
                && user.starts_with("Kontext:\nIT-Land baut Websites.\n\nWir bieten Hosting an.")
                && user.ends_with("Frage:\nWas bieten Sie an?")
        })
        .times(1)
        .returning(|_, _| Ok("  Wir bauen **Websites**.  ".to_string()));

    let answer = knowledge::answer(&search, &model, &Assistant::default(), "Was bieten Sie an?")
        .await
        .unwrap();

    assert_eq!(answer.text, "Wir bauen **Websites**.");
    assert!(answer.from_model);
}

#[tokio::test]
async fn test_knowledge_rejects_empty_question() {
    let result = knowledge::answer(
        &MockKnowledgeSearch::new(),
        &MockChatModel::new(),
        &Assistant::default(),
        "  ",
    )
    .await;

    assert!(matches!(result, Err(BookingError::Validation(_))));
}

fn free_calendar() -> MockCalendarService {
    let mut calendar = MockCalendarService::new();
    calendar
        .expect_busy_intervals()
        .returning(|_, _| Ok(Vec::new()));
    calendar
}

fn empty_store() -> MockAppointmentStore {
    let mut store = MockAppointmentStore::new();
    store
        .expect_booked_intervals()
        .returning(|_, _| Ok(Vec::new()));
    store
}

fn desk(
    drafts: Arc<MemoryDrafts>,
    booking_calendar: MockCalendarService,
    booking_store: MockAppointmentStore,
    mailer: MockMailer,
    search: MockKnowledgeSearch,
    model: MockChatModel,
) -> ChatDesk {
    let availability = AvailabilityFinder::new(
        Arc::new(free_calendar()),
        Arc::new(empty_store()),
        BusinessHours::default(),
        SlotParams::default(),
    );
    let booking = BookingWriter::new(
        Arc::new(booking_calendar),
        Arc::new(booking_store),
        Arc::new(mailer),
        BusinessHours::default(),
        Duration::minutes(30),
        None,
    );
    ChatDesk::new(
        drafts,
        Arc::new(booking),
        Arc::new(availability),
        Arc::new(search),
        Arc::new(model),
        Assistant::default(),
    )
}

#[tokio::test]
async fn test_desk_answers_questions_from_knowledge() {
    let drafts = Arc::new(MemoryDrafts::default());
    let mut search = MockKnowledgeSearch::new();
    search
        .expect_search()
        .returning(|_, _| Ok(vec!["We build websites.".to_string()]));
    let mut model = MockChatModel::new();
    model
        .expect_complete()
        .returning(|_, _| Ok("We build *websites*.".to_string()));

    let desk = desk(
        drafts.clone(),
        MockCalendarService::new(),
        MockAppointmentStore::new(),
        MockMailer::new(),
        search,
        model,
    );
    let reply = desk
        .handle("s1", "What do you do?", common::now())
        .await
        .unwrap();

    assert_eq!(reply.text, "We build *websites*.");
    assert!(reply.markdown);
    assert!(drafts.get("s1").is_none());
}

#[tokio::test]
async fn test_desk_books_through_conversation() {
    let drafts = Arc::new(MemoryDrafts::default());

    let mut store = MockAppointmentStore::new();
    store
        .expect_find_by_idempotency_key()
        .withf(|key| key.starts_with("chat:s1:"))
        .returning(|_| Ok(None));
    store
        .expect_reserve()
        .times(1)
        .returning(|new| Ok(common::stored(new, AppointmentStatus::Pending, None)));
    store.expect_confirm().returning(|id, event_id| {
        // First free slot after Thursday 10:00 in Berlin is 10:15.
        let start = common::now() + Duration::minutes(15);
        let mut appointment = common::confirmed_appointment(start, "chat");
        appointment.id = id;
        appointment.calendar_event_id = Some(event_id.to_string());
        Ok(appointment)
    });
    store
        .expect_set_notification_status()
        .returning(|_, _| Ok(()));

    let mut calendar = free_calendar();
    calendar
        .expect_create_event()
        .returning(|_| Ok("evt-7".to_string()));

    let mut mailer = MockMailer::new();
    mailer.expect_send().times(1).returning(|_| Ok(()));

    let desk = desk(
        drafts.clone(),
        calendar,
        store,
        mailer,
        MockKnowledgeSearch::new(),
        MockChatModel::new(),
    );
    let now = common::now();

    let reply = desk
        .handle("s1", "I would like to book an appointment", now)
        .await
        .unwrap();
    assert!(reply.text.contains("first and last name"));
    assert!(!reply.markdown);
    assert_eq!(drafts.get("s1"), Some(Draft::default()));

    for input in ["Anna Schmidt", "01.03.1990", "030 1234567", "anna@example.com"] {
        desk.handle("s1", input, now).await.unwrap();
    }
    let reply = desk.handle("s1", "Check-up", now).await.unwrap();
    assert!(reply.text.contains("1. Thu 15.10.2026 10:15"));
    assert_eq!(drafts.get("s1").map(|d| d.offered.len()), Some(5));

    let reply = desk.handle("s1", "1", now).await.unwrap();
    assert!(reply.text.contains("Please confirm"));

    let reply = desk.handle("s1", "yes", now).await.unwrap();
    assert!(reply.text.contains("is booked"));
    assert!(reply.text.contains("anna@example.com"));
    assert!(drafts.get("s1").is_none());
}

#[tokio::test]
async fn test_desk_reoffers_slots_after_conflict() {
    let drafts = Arc::new(MemoryDrafts::default());
    let start = common::now() + Duration::minutes(15);
    let slot = Slot::new(start, start + Duration::minutes(30));
    let mut draft = Draft {
        first_name: Some("Anna".to_string()),
        last_name: Some("Schmidt".to_string()),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 1),
        phone: Some("0301234567".to_string()),
        email: Some("anna@example.com".to_string()),
        reason: Some("Check-up".to_string()),
        ..Draft::default()
    };
    draft.choose_slot(&slot);
    drafts.save("s2", &draft).await.unwrap();

    let mut store = MockAppointmentStore::new();
    store
        .expect_find_by_idempotency_key()
        .returning(|_| Ok(None));
    store
        .expect_reserve()
        .returning(|_| Err(BookingError::Conflict("overlap".to_string())));

    let desk = desk(
        drafts.clone(),
        free_calendar(),
        store,
        MockMailer::new(),
        MockKnowledgeSearch::new(),
        MockChatModel::new(),
    );
    let reply = desk.handle("s2", "ja", common::now()).await.unwrap();

    assert!(reply.text.starts_with("Sorry, that time was just taken."));
    let saved = drafts.get("s2").expect("draft kept");
    assert_eq!(saved.stage(), Stage::Slot);
    assert_eq!(saved.offered.len(), 5);
}

#[tokio::test]
async fn test_desk_reoffers_slots_when_chosen_time_has_passed() {
    let drafts = Arc::new(MemoryDrafts::default());
    // The conversation stalled until the chosen slot was in the past.
    let start = common::now() - Duration::hours(1);
    let slot = Slot::new(start, start + Duration::minutes(30));
    let mut draft = Draft {
        first_name: Some("Anna".to_string()),
        last_name: Some("Schmidt".to_string()),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 1),
        phone: Some("0301234567".to_string()),
        email: Some("anna@example.com".to_string()),
        reason: Some("Check-up".to_string()),
        ..Draft::default()
    };
    draft.choose_slot(&slot);
    drafts.save("s4", &draft).await.unwrap();

    let mut store = MockAppointmentStore::new();
    store.expect_reserve().never();

    let desk = desk(
        drafts.clone(),
        MockCalendarService::new(),
        store,
        MockMailer::new(),
        MockKnowledgeSearch::new(),
        MockChatModel::new(),
    );
    let reply = desk.handle("s4", "yes", common::now()).await.unwrap();

    assert!(reply.text.starts_with("Sorry, that time can no longer be booked."));
    let saved = drafts.get("s4").expect("draft kept");
    assert_eq!(saved.stage(), Stage::Slot);
    assert_eq!(saved.offered.len(), 5);
    assert!(saved.offered.iter().all(|offer| offer.start > common::now()));
    assert_eq!(saved.email.as_deref(), Some("anna@example.com"));
}

#[tokio::test]
async fn test_desk_cancel_discards_draft() {
    let drafts = Arc::new(MemoryDrafts::default());
    drafts.save("s3", &Draft::default()).await.unwrap();

    let desk = desk(
        drafts.clone(),
        MockCalendarService::new(),
        MockAppointmentStore::new(),
        MockMailer::new(),
        MockKnowledgeSearch::new(),
        MockChatModel::new(),
    );
    let reply = desk.handle("s3", "cancel", common::now()).await.unwrap();

    assert!(reply.text.contains("cancelled"));
    assert!(drafts.get("s3").is_none());
}
