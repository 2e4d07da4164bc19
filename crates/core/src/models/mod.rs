pub mod appointment;
pub mod chat;
pub mod draft;
pub mod slot;
pub mod token;
