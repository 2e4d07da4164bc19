//! Microsoft Graph: delegated sign-in, calendar free/busy and events, and
//! mail delivery from the operator's mailbox.

pub mod auth;
pub mod calendar;
pub mod mail;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Graph `dateTimeTimeZone` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl GraphDateTime {
    pub fn utc(at: DateTime<Utc>) -> Self {
        Self {
            date_time: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    /// Requests send `Prefer: outlook.timezone="UTC"`, so values without an
    /// offset are UTC.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        parse_graph_datetime(&self.date_time)
    }
}

/// Parses Graph timestamps such as `2026-10-19T07:00:00.0000000`, with or
/// without an offset.
pub fn parse_graph_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) const PREFER_UTC: (&str, &str) = ("Prefer", "outlook.timezone=\"UTC\"");
