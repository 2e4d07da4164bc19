use chrono::{Datelike, DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::errors::{BookingError, BookingResult};

/// Opening hours of the business, in its local time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    pub timezone: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub weekdays: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Berlin,
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl BusinessHours {
    pub fn new(
        timezone: Tz,
        open: NaiveTime,
        close: NaiveTime,
        weekdays: Vec<Weekday>,
    ) -> BookingResult<Self> {
        if open >= close {
            return Err(BookingError::Configuration(format!(
                "Opening time {} must be before closing time {}",
                open, close
            )));
        }
        if weekdays.is_empty() {
            return Err(BookingError::Configuration(
                "At least one business day is required".to_string(),
            ));
        }
        Ok(Self {
            timezone,
            open,
            close,
            weekdays,
        })
    }

    /// Parses a comma-separated list such as `mon,tue,wed`.
    pub fn parse_weekdays(value: &str) -> BookingResult<Vec<Weekday>> {
        value
            .split(',')
            .map(str::trim)
            .filter(|day| !day.is_empty())
            .map(|day| {
                day.parse::<Weekday>().map_err(|_| {
                    BookingError::Configuration(format!("Unknown weekday: {}", day))
                })
            })
            .collect()
    }

    pub fn is_business_day(&self, day: Weekday) -> bool {
        self.weekdays.contains(&day)
    }

    /// Whether `[start, end)` lies on one business day, inside opening hours.
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if end <= start {
            return false;
        }
        let local_start = start.with_timezone(&self.timezone);
        let local_end = end.with_timezone(&self.timezone);
        let day = local_start.date_naive();

        self.is_business_day(day.weekday())
            && local_end.date_naive() == day
            && local_start.time() >= self.open
            && local_end.time() <= self.close
    }
}
