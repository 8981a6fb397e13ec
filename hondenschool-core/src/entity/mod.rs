//! Typed views over records, and the builders that create them from input.

mod agenda;
mod lesson;
mod notice;
mod series;

pub use agenda::{AgendaItem, AgendaKind, LESSON_COLOR, build_agenda};
pub use lesson::{Lesson, LessonInput, Location, build_lesson};
pub use notice::{DEFAULT_NOTICE_COLOR, Notice, NoticeInput, build_notice};
pub use series::{Catalog, Class, GeneratedSeries, Package, Series, SeriesPlan, generate_series};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::BuildError;
use crate::store::Record;

/// Minute precision, as used by `datetime-local` style inputs.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const ACCEPTED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a local date-time from form input or an RFC 3339 timestamp.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, BuildError> {
    let s = input.trim();

    for format in ACCEPTED_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_local())
        .map_err(|_| BuildError::InvalidDateTime(s.to_string()))
}

/// Parse `YYYY-MM-DD`, or the date part of a date-time.
pub fn parse_date(input: &str) -> Result<NaiveDate, BuildError> {
    let s = input.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| parse_datetime(s).map(|dt| dt.date()))
        .map_err(|_| BuildError::InvalidDate(s.to_string()))
}

fn from_record<T: DeserializeOwned>(record: &Record) -> Option<T> {
    serde_json::from_value(Value::Object(record.clone())).ok()
}

fn to_record<T: Serialize>(entity: &T) -> Record {
    match serde_json::to_value(entity) {
        Ok(Value::Object(record)) => record,
        _ => Record::new(),
    }
}

/// Ids arrive as strings or numbers depending on the sheet.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid id: {other}"))),
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}
