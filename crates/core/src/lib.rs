//! # SlotDesk Core
//!
//! Domain types and logic of the appointment chatbot, independent of any
//! transport or storage:
//!
//! - **Models**: appointments, slots, busy intervals, conversation drafts, tokens
//! - **Scheduling**: slot generation, availability and the booking saga
//! - **Conversation**: the field collector, persona prompts and knowledge answers
//! - **Ports**: traits implemented by the database and integration crates

pub mod conversation;
pub mod errors;
pub mod models;
pub mod ports;
pub mod scheduling;
pub mod validation;
