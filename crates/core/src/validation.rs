//! Field checks shared by the booking endpoint and the chat collector.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::errors::{BookingError, BookingResult};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]{2,}$").expect("valid email pattern"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()/\-]+$").expect("valid phone pattern"));

const BIRTHDATE_FORMATS: [&str; 3] = ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];
const MAX_AGE_YEARS: i32 = 130;
const MAX_REASON_CHARS: usize = 500;

fn invalid(message: &str) -> BookingError {
    BookingError::Validation(message.to_string())
}

/// Splits "first [middle ...] last" into first name and the remaining words.
pub fn split_name(input: &str) -> BookingResult<(String, String)> {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        [first, rest @ ..] if !rest.is_empty() => Ok((first.to_string(), rest.join(" "))),
        _ => Err(invalid("Please enter your first and last name.")),
    }
}

pub fn check_name_part(value: &str, field: &str) -> BookingResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::Validation(format!("{} is required.", field)));
    }
    Ok(value.to_string())
}

pub fn parse_birthdate(input: &str, today: NaiveDate) -> BookingResult<NaiveDate> {
    let input = input.trim();
    let date = BIRTHDATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .ok_or_else(|| invalid("Please enter your date of birth as DD.MM.YYYY."))?;
    check_birthdate(date, today)
}

pub fn check_birthdate(date: NaiveDate, today: NaiveDate) -> BookingResult<NaiveDate> {
    if date >= today {
        return Err(invalid("The date of birth must be in the past."));
    }
    if today.year() - date.year() > MAX_AGE_YEARS {
        return Err(invalid("Please check the year of your date of birth."));
    }
    Ok(date)
}

/// Accepts common phone notations and returns the trimmed number.
pub fn normalize_phone(input: &str) -> BookingResult<String> {
    let input = input.trim();
    if !PHONE.is_match(input) {
        return Err(invalid("Please enter a phone number using digits only."));
    }
    let digits = input.chars().filter(char::is_ascii_digit).count();
    if !(6..=15).contains(&digits) {
        return Err(invalid("A phone number has between 6 and 15 digits."));
    }
    Ok(input.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub fn normalize_email(input: &str) -> BookingResult<String> {
    let email = input.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(invalid("Please enter a valid email address."));
    }
    Ok(email)
}

pub fn check_reason(input: &str) -> BookingResult<String> {
    let reason = input.trim();
    if reason.is_empty() {
        return Err(invalid("Please describe the reason for your visit."));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(invalid("Please keep the reason under 500 characters."));
    }
    Ok(reason.to_string())
}
