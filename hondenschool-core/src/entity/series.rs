//! Classes, packages and series, and generation of a series of lessons.
//!
//! A package belongs to a class and a series belongs to a package. None of
//! these references are checked; a dangling id is simply shown as unknown.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{DATETIME_FORMAT, Lesson, LessonInput, Location, build_lesson, de_id, de_opt_id, from_record, to_record};
use crate::error::BuildError;
use crate::id::generate_id;
use crate::store::Record;

/// A klas, the top of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "naam")]
    pub name: String,
}

impl Class {
    pub fn from_record(record: &Record) -> Option<Self> {
        from_record(record)
    }
}

/// A pakket of lessons offered within a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "naam")]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
}

impl Package {
    pub fn from_record(record: &Record) -> Option<Self> {
        from_record(record)
    }

    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

/// A lessenreeks within a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "naam")]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
}

impl Series {
    pub fn from_record(record: &Record) -> Option<Self> {
        from_record(record)
    }

    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

/// Known packages and series, extended in place by the ensure operations.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub packages: Vec<Package>,
    pub series: Vec<Series>,
}

impl Catalog {
    pub fn from_records(packages: &[Record], series: &[Record]) -> Self {
        Catalog {
            packages: packages.iter().filter_map(Package::from_record).collect(),
            series: series.iter().filter_map(Series::from_record).collect(),
        }
    }

    /// The package called `name` within `class_id`, created if missing.
    pub fn ensure_package(&mut self, class_id: Option<&str>, name: &str) -> Package {
        let class_id = class_id.map(str::trim).filter(|c| !c.is_empty());

        if let Some(existing) = self
            .packages
            .iter()
            .find(|p| p.class_id.as_deref() == class_id && same_name(&p.name, name))
        {
            return existing.clone();
        }

        let package = Package {
            id: generate_id("pak"),
            name: name.trim().to_string(),
            class_id: class_id.map(String::from),
        };
        self.packages.push(package.clone());
        package
    }

    /// The series called `name` within `package_id`, created if missing.
    pub fn ensure_series(&mut self, package_id: &str, name: &str) -> Series {
        let package_id = package_id.trim();

        if let Some(existing) = self
            .series
            .iter()
            .find(|s| s.package_id.as_deref() == Some(package_id) && same_name(&s.name, name))
        {
            return existing.clone();
        }

        let series = Series {
            id: generate_id("reeks"),
            name: name.trim().to_string(),
            package_id: Some(package_id.to_string()),
        };
        self.series.push(series.clone());
        series
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Everything needed to lay out a recurring series of lessons.
#[derive(Debug, Clone)]
pub struct SeriesPlan {
    /// Lesson title; the series name is used when empty.
    pub title: String,
    pub series_name: String,
    pub package_name: String,
    pub class_id: Option<String>,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub interval_days: i64,
    pub count: u32,
    pub duration_minutes: i64,
    pub trainers: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct GeneratedSeries {
    pub package: Package,
    pub series: Series,
    pub lessons: Vec<Lesson>,
}

/// Lay out `count` lessons, `interval_days` apart, under one package/series
/// pair taken from (or added to) the catalog.
pub fn generate_series(plan: &SeriesPlan, catalog: &mut Catalog) -> Result<GeneratedSeries, BuildError> {
    if plan.count == 0 {
        return Err(BuildError::InvalidPlan("count must be at least 1".into()));
    }
    if plan.interval_days < 1 {
        return Err(BuildError::InvalidPlan("interval must be at least 1 day".into()));
    }
    if plan.duration_minutes < 1 {
        return Err(BuildError::InvalidPlan("duration must be positive".into()));
    }
    if plan.series_name.trim().is_empty() || plan.package_name.trim().is_empty() {
        return Err(BuildError::InvalidPlan("series and package need a name".into()));
    }

    // Lay out and validate every lesson before the catalog is touched, so a
    // rejected plan adds no package or series.
    let mut lessons = (0..plan.count)
        .map(|k| {
            let date = plan
                .interval_days
                .checked_mul(i64::from(k))
                .and_then(Duration::try_days)
                .and_then(|offset| plan.start_date.checked_add_signed(offset))
                .ok_or_else(out_of_range)?;
            build_lesson(LessonInput {
                start: date.and_time(plan.start_time).format(DATETIME_FORMAT).to_string(),
                duration_minutes: Some(plan.duration_minutes),
                trainers: plan.trainers.clone(),
                location_name: plan.location.name.clone(),
                maps_url: plan.location.maps_url.clone(),
                ..Default::default()
            })
            .map_err(|e| match e {
                BuildError::InvalidPlan(_) => e,
                _ => out_of_range(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let package = catalog.ensure_package(plan.class_id.as_deref(), &plan.package_name);
    let series = catalog.ensure_series(&package.id, &plan.series_name);

    let title = if plan.title.trim().is_empty() {
        series.name.clone()
    } else {
        plan.title.trim().to_string()
    };

    for (k, lesson) in lessons.iter_mut().enumerate() {
        lesson.title = format!("{} ({}/{})", title, k + 1, plan.count);
        lesson.package_id = Some(package.id.clone());
        lesson.series_id = Some(series.id.clone());
    }

    Ok(GeneratedSeries {
        package,
        series,
        lessons,
    })
}

fn out_of_range() -> BuildError {
    BuildError::InvalidPlan("series runs past the supported date range".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan() -> SeriesPlan {
        SeriesPlan {
            title: String::new(),
            series_name: "Puppy voorjaar".into(),
            package_name: "Puppy 8 lessen".into(),
            class_id: Some("klas-1".into()),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            interval_days: 7,
            count: 4,
            duration_minutes: 45,
            trainers: vec!["Els".into()],
            location: Location {
                name: "Veld A".into(),
                maps_url: None,
            },
        }
    }

    #[test]
    fn test_generate_weekly_series() {
        let mut catalog = Catalog::default();

        let generated = generate_series(&plan(), &mut catalog).unwrap();

        let dates: Vec<_> = generated
            .lessons
            .iter()
            .map(|l| &l.start_timestamp[..10])
            .collect();
        assert_eq!(dates, vec!["2025-01-05", "2025-01-12", "2025-01-19", "2025-01-26"]);

        assert!(generated
            .lessons
            .iter()
            .all(|l| l.series_id.as_deref() == Some(generated.series.id.as_str())
                && l.package_id.as_deref() == Some(generated.package.id.as_str())
                && l.trainers == vec!["Els"]
                && l.location.name == "Veld A"
                && l.duration_minutes == 45));

        assert_eq!(generated.lessons[0].title, "Puppy voorjaar (1/4)");
        assert_eq!(generated.lessons[0].end_timestamp, "2025-01-05T10:45");
        assert_eq!(generated.series.package_id.as_deref(), Some(generated.package.id.as_str()));
        assert_eq!(catalog.packages.len(), 1);
        assert_eq!(catalog.series.len(), 1);
    }

    #[test]
    fn test_second_generation_reuses_package_and_series() {
        let mut catalog = Catalog::default();

        let first = generate_series(&plan(), &mut catalog).unwrap();
        let second = generate_series(
            &SeriesPlan {
                series_name: " puppy VOORJAAR ".into(),
                ..plan()
            },
            &mut catalog,
        )
        .unwrap();

        assert_eq!(first.package, second.package);
        assert_eq!(first.series, second.series);
        assert_eq!(catalog.packages.len(), 1);
        assert_eq!(catalog.series.len(), 1);
    }

    #[test]
    fn test_ensure_is_scoped_to_parent() {
        let mut catalog = Catalog::default();

        let a = catalog.ensure_package(Some("klas-1"), "Gevorderd");
        let b = catalog.ensure_package(Some("klas-2"), "Gevorderd");
        assert_ne!(a.id, b.id);

        let s1 = catalog.ensure_series(&a.id, "Najaar");
        let s2 = catalog.ensure_series(&b.id, "Najaar");
        let s3 = catalog.ensure_series(&a.id, "najaar");
        assert_ne!(s1.id, s2.id);
        assert_eq!(s1.id, s3.id);
    }

    #[test]
    fn test_catalog_from_loose_records() {
        let packages = vec![json!({ "id": 3, "naam": "Puppy", "classId": 1 })
            .as_object()
            .cloned()
            .unwrap()];
        let mut catalog = Catalog::from_records(&packages, &[]);

        let package = catalog.ensure_package(Some("1"), "puppy");
        assert_eq!(package.id, "3");
    }

    #[test]
    fn test_invalid_plans() {
        let mut catalog = Catalog::default();
        for bad in [
            SeriesPlan { count: 0, ..plan() },
            SeriesPlan { interval_days: 0, ..plan() },
            SeriesPlan { duration_minutes: 0, ..plan() },
            SeriesPlan { series_name: " ".into(), ..plan() },
            SeriesPlan { interval_days: 100_000_000, count: 2, ..plan() },
            SeriesPlan { interval_days: i64::MAX / 2, count: 3, ..plan() },
            SeriesPlan { duration_minutes: i64::MAX / 2, ..plan() },
        ] {
            assert!(matches!(
                generate_series(&bad, &mut catalog),
                Err(BuildError::InvalidPlan(_))
            ));
        }
        assert!(catalog.packages.is_empty());
    }
}
