//! Decoding of the response shapes the sheet backends produce.

use serde_json::Value;
use tracing::debug;

use crate::error::SheetError;
use crate::store::Record;

/// The four accepted wrappers around a list of items.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// `[...]`
    Bare(Vec<Value>),
    /// `{"items": [...]}`
    Items(Vec<Value>),
    /// `{"data": {"items": [...]}}`
    NestedItems(Vec<Value>),
    /// `{"data": [...]}`
    Data(Vec<Value>),
}

impl Envelope {
    /// Pick the envelope variant for a parsed body.
    pub fn discriminate(value: Value) -> Result<Envelope, SheetError> {
        let mut object = match value {
            Value::Array(items) => return Ok(Envelope::Bare(items)),
            Value::Object(object) => object,
            _ => return Err(SheetError::UnexpectedShape),
        };

        if let Some(Value::Array(items)) = object.remove("items") {
            return Ok(Envelope::Items(items));
        }

        match object.remove("data") {
            Some(Value::Array(items)) => Ok(Envelope::Data(items)),
            Some(Value::Object(mut data)) => match data.remove("items") {
                Some(Value::Array(items)) => Ok(Envelope::NestedItems(items)),
                _ => Err(SheetError::UnexpectedShape),
            },
            _ => Err(SheetError::UnexpectedShape),
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        let items = match self {
            Envelope::Bare(items)
            | Envelope::Items(items)
            | Envelope::NestedItems(items)
            | Envelope::Data(items) => items,
        };
        let total = items.len();

        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect();

        if records.len() < total {
            debug!(dropped = total - records.len(), "Ignoring non-object items");
        }
        records
    }
}

/// Parse a response body as JSON, rejecting HTML pages and `{"ok": false}`.
pub fn parse_body(body: &str) -> Result<Value, SheetError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();

    if trimmed.starts_with('<') {
        return Err(SheetError::HtmlResponse);
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| SheetError::MalformedJson(e.to_string()))?;

    if value.get("ok") == Some(&Value::Bool(false)) {
        let reason = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(SheetError::Rejected(reason));
    }

    Ok(value)
}

/// Parse and unwrap a collection response into records.
pub fn decode_items(body: &str) -> Result<Vec<Record>, SheetError> {
    let value = parse_body(body)?;
    Ok(Envelope::discriminate(value)?.into_records())
}
