//! Slot generation, availability and the booking saga.

pub mod availability;
pub mod booking;
pub mod hours;
pub mod slots;
