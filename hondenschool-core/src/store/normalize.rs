//! Record clean-up applied on every bucket read and write.

use serde_json::Value;

use crate::store::Record;

pub const ACTIEF: &str = "actief";
pub const INACTIEF: &str = "inactief";

const ACTIEF_SYNONYMS: &[&str] = &["actief", "active", "aan", "yes", "ja", "on", "1", "true"];
const INACTIEF_SYNONYMS: &[&str] = &["inactief", "inactive", "uit", "no", "nee", "off", "0", "false"];

/// Normalize every record of a bucket.
pub fn normalize(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().map(normalize_record).collect()
}

/// Trim strings, fold capitalized keys onto their canonical form, and pin
/// `status` to `actief`/`inactief`.
pub fn normalize_record(record: Record) -> Record {
    let mut out = Record::new();

    for (key, value) in &record {
        let canonical = canonical_key(key);
        // An explicit canonical key beats its capitalized alias.
        if canonical != *key && record.contains_key(&canonical) {
            continue;
        }
        out.insert(canonical, trim_value(value.clone()));
    }

    let status = normalize_status(out.get("status"));
    out.insert("status".to_string(), Value::String(status.to_string()));
    out
}

/// Map a loosely typed status onto `actief` or `inactief`.
///
/// Anything not found in either synonym table counts as `actief`, including
/// a missing or empty value.
pub fn normalize_status(value: Option<&Value>) -> &'static str {
    match value {
        Some(Value::Bool(false)) => INACTIEF,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => INACTIEF,
        Some(Value::String(s)) => {
            let s = s.trim().to_lowercase();
            if ACTIEF_SYNONYMS.contains(&s.as_str()) {
                ACTIEF
            } else if INACTIEF_SYNONYMS.contains(&s.as_str()) {
                INACTIEF
            } else {
                ACTIEF
            }
        }
        _ => ACTIEF,
    }
}

/// `Status` -> `status`, `StartTimestamp` -> `startTimestamp`, `ID` -> `id`.
fn canonical_key(key: &str) -> String {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if !first.is_uppercase() {
        return key.to_string();
    }
    if key.chars().all(|c| !c.is_lowercase()) {
        return key.to_lowercase();
    }
    first.to_lowercase().chain(chars).collect()
}

fn trim_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(trim_value).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, trim_value(v))).collect())
        }
        other => other,
    }
}
