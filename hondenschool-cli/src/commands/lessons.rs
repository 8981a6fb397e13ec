use anyhow::{Context, Result};
use dialoguer::Input;
use hondenschool_core::Collection;
use hondenschool_core::entity::{Lesson, LessonInput, Series, build_lesson};
use hondenschool_core::store::remove_by_id;
use owo_colors::OwoColorize;
use serde_json::{Value, json};

use super::{App, records_of};
use crate::render::render_lesson;

pub struct AddArgs {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<i64>,
    pub trainers: Vec<String>,
    pub location: Option<String>,
    /// Series id or name.
    pub series: Option<String>,
}

pub async fn list() -> Result<()> {
    let app = App::load()?;
    let outcomes = app.fetch(&[Collection::Lessen, Collection::Reeksen]).await;

    let series: Vec<Series> = records_of(&outcomes, Collection::Reeksen)
        .iter()
        .filter_map(Series::from_record)
        .collect();

    let mut lessons: Vec<Lesson> = records_of(&outcomes, Collection::Lessen)
        .iter()
        .filter_map(Lesson::from_record)
        .collect();
    lessons.sort_by(|a, b| a.start_timestamp.cmp(&b.start_timestamp));

    if lessons.is_empty() {
        println!("{}", "No lessons".dimmed());
        return Ok(());
    }

    for lesson in &lessons {
        let series_name = lesson
            .series_id
            .as_deref()
            .and_then(|id| series.iter().find(|s| s.id == id))
            .map(|s| s.name.as_str());
        println!("{}", render_lesson(lesson, series_name));
    }

    Ok(())
}

pub async fn add(args: AddArgs, push: bool) -> Result<()> {
    let app = App::load()?;

    let title = match args.title {
        Some(t) => t,
        None => Input::<String>::new()
            .with_prompt("  Title")
            .interact_text()?,
    };

    let start = match args.start {
        Some(s) => s,
        None => Input::<String>::new()
            .with_prompt("  Start (YYYY-MM-DDTHH:MM)")
            .interact_text()?,
    };

    let outcomes = app.fetch(&[Collection::Lessen, Collection::Reeksen]).await;
    let mut lessons = records_of(&outcomes, Collection::Lessen);

    let series = match args.series.as_deref() {
        Some(wanted) => Some(find_series(&records_of(&outcomes, Collection::Reeksen), wanted)?),
        None => None,
    };

    let lesson = build_lesson(LessonInput {
        title,
        start,
        end: args.end,
        duration_minutes: args.duration,
        trainers: args.trainers,
        location_name: args.location.unwrap_or_default(),
        package_id: series.as_ref().and_then(|s| s.package_id.clone()),
        series_id: series.map(|s| s.id),
        ..Default::default()
    })
    .context("Invalid lesson")?;

    let record = lesson.to_record();
    lessons.push(record.clone());
    app.save(Collection::Lessen, lessons);

    println!("{} added", "✓".green());
    println!("{}", render_lesson(&lesson, None));

    app.push(push, Collection::Lessen, "add", Value::Object(record))
        .await;

    Ok(())
}

pub async fn delete(id: &str, push: bool) -> Result<()> {
    let app = App::load()?;
    let outcomes = app.fetch(&[Collection::Lessen]).await;
    let mut lessons = records_of(&outcomes, Collection::Lessen);

    if remove_by_id(&mut lessons, id) == 0 {
        anyhow::bail!("No lesson with id '{}'", id);
    }
    app.save(Collection::Lessen, lessons);

    println!("{} deleted {}", "✓".green(), id);

    app.push(push, Collection::Lessen, "delete", json!({ "id": id }))
        .await;

    Ok(())
}

fn find_series(records: &[hondenschool_core::Record], wanted: &str) -> Result<Series> {
    let all: Vec<Series> = records.iter().filter_map(Series::from_record).collect();
    let wanted_lower = wanted.trim().to_lowercase();

    match all
        .iter()
        .find(|s| s.id == wanted || s.name.trim().to_lowercase() == wanted_lower)
    {
        Some(series) => Ok(series.clone()),
        None => {
            let available: Vec<_> = all.iter().map(|s| s.name.clone()).collect();
            anyhow::bail!(
                "Series '{}' not found. Available: {}",
                wanted,
                available.join(", ")
            );
        }
    }
}
