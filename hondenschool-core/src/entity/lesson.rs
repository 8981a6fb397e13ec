use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DATETIME_FORMAT, de_id, de_opt_id, from_record, parse_datetime, to_record};
use crate::error::BuildError;
use crate::id::generate_id;
use crate::store::{ACTIEF, Record, normalize_status};

const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub start_timestamp: String,
    #[serde(default)]
    pub end_timestamp: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default)]
    pub trainers: Vec<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    ACTIEF.to_string()
}

impl Lesson {
    /// Typed view of a stored record. `None` when id or start is missing.
    pub fn from_record(record: &Record) -> Option<Self> {
        from_record(record)
    }

    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

/// Raw lesson form input.
#[derive(Debug, Clone, Default)]
pub struct LessonInput {
    /// Existing id when editing; a new one is generated otherwise.
    pub id: Option<String>,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub duration_minutes: Option<i64>,
    pub trainers: Vec<String>,
    pub location_name: String,
    pub maps_url: Option<String>,
    pub package_id: Option<String>,
    pub series_id: Option<String>,
    pub status: Option<String>,
}

/// Validate form input and construct a lesson.
///
/// The end time is taken from `end` when given, otherwise derived from the
/// duration (one hour by default).
pub fn build_lesson(input: LessonInput) -> Result<Lesson, BuildError> {
    if input.start.trim().is_empty() {
        return Err(BuildError::MissingStart);
    }
    let start = parse_datetime(&input.start)?;

    let explicit_end = input.end.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (end, duration_minutes) = match explicit_end {
        Some(end) => {
            let end = parse_datetime(end)?;
            if end < start {
                return Err(BuildError::EndBeforeStart);
            }
            (end, (end - start).num_minutes())
        }
        None => {
            let minutes = input
                .duration_minutes
                .filter(|m| *m > 0)
                .unwrap_or(DEFAULT_DURATION_MINUTES);
            let end = Duration::try_minutes(minutes)
                .and_then(|d| start.checked_add_signed(d))
                .ok_or(BuildError::DurationOutOfRange(minutes))?;
            (end, minutes)
        }
    };

    let trainers = input
        .trainers
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    let status = input
        .status
        .map(|s| normalize_status(Some(&Value::String(s))))
        .unwrap_or(ACTIEF)
        .to_string();

    Ok(Lesson {
        id: non_empty(input.id).unwrap_or_else(|| generate_id("les")),
        title: input.title.trim().to_string(),
        start_timestamp: start.format(DATETIME_FORMAT).to_string(),
        end_timestamp: end.format(DATETIME_FORMAT).to_string(),
        duration_minutes,
        trainers,
        location: Location {
            name: input.location_name.trim().to_string(),
            maps_url: non_empty(input.maps_url),
        },
        package_id: non_empty(input.package_id),
        series_id: non_empty(input.series_id),
        status,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(start: &str) -> LessonInput {
        LessonInput {
            title: " Puppycursus ".into(),
            start: start.into(),
            trainers: vec![" Els ".into(), "".into(), "  ".into(), "Bram".into()],
            location_name: "Veld A".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_derived_from_duration() {
        let lesson = build_lesson(LessonInput {
            duration_minutes: Some(90),
            ..input("2025-01-05 19:00:42")
        })
        .unwrap();

        assert_eq!(lesson.start_timestamp, "2025-01-05T19:00");
        assert_eq!(lesson.end_timestamp, "2025-01-05T20:30");
        assert_eq!(lesson.duration_minutes, 90);
        assert_eq!(lesson.title, "Puppycursus");
        assert_eq!(lesson.trainers, vec!["Els", "Bram"]);
        assert_eq!(lesson.status, "actief");
        assert!(lesson.id.starts_with("les-"));
    }

    #[test]
    fn test_default_duration_is_an_hour() {
        let lesson = build_lesson(input("2025-01-05T23:30")).unwrap();
        assert_eq!(lesson.end_timestamp, "2025-01-06T00:30");
        assert_eq!(lesson.duration_minutes, 60);
    }

    #[test]
    fn test_explicit_end_wins() {
        let lesson = build_lesson(LessonInput {
            end: Some("2025-01-05T19:45".into()),
            duration_minutes: Some(120),
            ..input("2025-01-05T19:00")
        })
        .unwrap();

        assert_eq!(lesson.end_timestamp, "2025-01-05T19:45");
        assert_eq!(lesson.duration_minutes, 45);
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(build_lesson(input("  ")), Err(BuildError::MissingStart));
        assert_eq!(
            build_lesson(input("gisteren")),
            Err(BuildError::InvalidDateTime("gisteren".into()))
        );
        assert_eq!(
            build_lesson(LessonInput {
                end: Some("2025-01-05T18:00".into()),
                ..input("2025-01-05T19:00")
            }),
            Err(BuildError::EndBeforeStart)
        );
    }

    #[test]
    fn test_huge_duration_is_rejected() {
        let huge = i64::MAX / 2;
        assert_eq!(
            build_lesson(LessonInput {
                duration_minutes: Some(huge),
                ..input("2025-01-05T10:00")
            }),
            Err(BuildError::DurationOutOfRange(huge))
        );
        // Still representable as a delta, but past the last supported date.
        assert_eq!(
            build_lesson(LessonInput {
                duration_minutes: Some(i64::MAX / 60_000 / 2),
                ..input("2025-01-05T10:00")
            }),
            Err(BuildError::DurationOutOfRange(i64::MAX / 60_000 / 2))
        );
    }

    #[test]
    fn test_status_and_ids_are_kept_when_editing() {
        let lesson = build_lesson(LessonInput {
            id: Some("les-42".into()),
            status: Some("Inactive".into()),
            series_id: Some("  ".into()),
            ..input("2025-01-05T19:00")
        })
        .unwrap();

        assert_eq!(lesson.id, "les-42");
        assert_eq!(lesson.status, "inactief");
        assert_eq!(lesson.series_id, None);
    }

    #[test]
    fn test_record_conversion() {
        let lesson = build_lesson(LessonInput {
            id: Some("les-1".into()),
            package_id: Some("pak-1".into()),
            ..input("2025-01-05T19:00")
        })
        .unwrap();

        let record = lesson.to_record();
        assert_eq!(record.get("startTimestamp"), Some(&json!("2025-01-05T19:00")));
        assert_eq!(record.get("location"), Some(&json!({ "name": "Veld A" })));
        assert!(!record.contains_key("seriesId"));

        assert_eq!(Lesson::from_record(&record), Some(lesson));
    }

    #[test]
    fn test_from_loose_record() {
        let record = json!({ "id": 7, "startTimestamp": "2025-02-01T10:00", "seriesId": 3 })
            .as_object()
            .cloned()
            .unwrap();

        let lesson = Lesson::from_record(&record).unwrap();
        assert_eq!(lesson.id, "7");
        assert_eq!(lesson.series_id.as_deref(), Some("3"));
        assert_eq!(lesson.status, "actief");

        let missing_start = json!({ "id": 1 }).as_object().cloned().unwrap();
        assert_eq!(Lesson::from_record(&missing_start), None);
    }
}
