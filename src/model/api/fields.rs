//! Parsing of individual request fields into domain types.
//!
//! Bodies carry these fields as plain strings so that a malformed value is a
//! 400 naming the field, rather than a body-shape failure.

use chrono::{NaiveDate, NaiveTime};

use crate::{
    error::{Error, Result},
    model::{
        common::{EpicNumber, Mobile},
        mongodb::Id,
    },
};

/// Trimmed, non-empty text.
pub fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::bad_request(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

/// Trimmed text, with blank treated as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn id(field: &str, value: &str) -> Result<Id> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::bad_request(format!("{field} is not a valid ID: {value}")))
}

pub fn epic(field: &str, value: &str) -> Result<EpicNumber> {
    value
        .parse()
        .map_err(|e| Error::bad_request(format!("{field}: {e}")))
}

pub fn mobile(field: &str, value: &str) -> Result<Mobile> {
    value
        .parse()
        .map_err(|e| Error::bad_request(format!("{field}: {e}")))
}

/// A `YYYY-MM-DD` date.
pub fn date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::bad_request(format!("{field} must be a YYYY-MM-DD date")))
}

/// An `HH:MM` or `HH:MM:SS` time of day.
pub fn time(field: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| Error::bad_request(format!("{field} must be an HH:MM time")))
}
