use serde::{Deserialize, Serialize};

use super::{DATE_FORMAT, de_id, from_record, parse_date, to_record};
use crate::error::BuildError;
use crate::id::generate_id;
use crate::store::Record;

pub const DEFAULT_NOTICE_COLOR: &str = "#f59e0b";

/// A mededeling shown between the lessons on the agenda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_NOTICE_COLOR.to_string()
}

impl Notice {
    pub fn from_record(record: &Record) -> Option<Self> {
        from_record(record)
    }

    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoticeInput {
    pub id: Option<String>,
    pub title: String,
    pub message: String,
    pub date: String,
    pub color: Option<String>,
}

pub fn build_notice(input: NoticeInput) -> Result<Notice, BuildError> {
    let title = input.title.trim().to_string();
    let message = input.message.trim().to_string();
    if title.is_empty() && message.is_empty() {
        return Err(BuildError::MissingText);
    }

    let date = parse_date(&input.date)?;

    let color = input
        .color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(default_color);

    let id = input
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| generate_id("med"));

    Ok(Notice {
        id,
        title,
        message,
        date_iso: date.format(DATE_FORMAT).to_string(),
        color,
    })
}
