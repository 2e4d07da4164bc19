pub mod appointment;
pub mod draft;
pub mod token;
