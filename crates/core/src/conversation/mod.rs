//! Chat-side logic: the appointment field collector, knowledge answers and
//! the desk that routes a turn to one of them.

pub mod collector;
pub mod desk;
pub mod knowledge;
pub mod persona;
