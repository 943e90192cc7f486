//! The one textual format for expense dates and times, shared by the write
//! path (request parsing) and the read path (response rendering).
//!
//! Dates are `DD-MM-YYYY`; times are 12-hour `HH:MM AM|PM`. Parsing also
//! accepts single-digit day/month/hour and a lower-case meridiem.
use time::{
    format_description::FormatItem, macros::format_description, Date, Time,
};

use crate::error::AppError;

pub const DATE_HINT: &str = "DD-MM-YYYY";
pub const TIME_HINT: &str = "HH:MM AM/PM";

const DATE_PARSE: &[FormatItem<'static>] =
    format_description!("[day padding:none]-[month padding:none]-[year]");
const TIME_PARSE: &[FormatItem<'static>] = format_description!(
    "[hour repr:12 padding:none]:[minute] [period case_sensitive:false]"
);
const DATE_RENDER: &[FormatItem<'static>] = format_description!("[day]-[month]-[year]");
const TIME_RENDER: &[FormatItem<'static>] = format_description!("[hour repr:12]:[minute] [period]");

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), DATE_PARSE)
        .map_err(|_| AppError::validation(format!("Invalid date format. Use {DATE_HINT}")))
}

pub fn parse_time(raw: &str) -> Result<Time, AppError> {
    Time::parse(raw.trim(), TIME_PARSE)
        .map_err(|_| AppError::validation(format!("Invalid time format. Use {TIME_HINT}")))
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_RENDER).unwrap_or_else(|_| date.to_string())
}

pub fn format_time(time: Time) -> String {
    time.format(TIME_RENDER).unwrap_or_else(|_| time.to_string())
}

/// `#[serde(serialize_with = ...)]` adaptors for response bodies.
pub mod serde_date {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date(*date))
    }
}

pub mod serde_time {
    use serde::Serializer;
    use time::Time;

    pub fn serialize<S: Serializer>(time: &Time, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*time))
    }
}
