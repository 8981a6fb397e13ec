use anyhow::{Context, Result};
use chrono::NaiveTime;
use hondenschool_core::Collection;
use hondenschool_core::entity::{Catalog, Location, SeriesPlan, generate_series, parse_date};
use hondenschool_core::store::id_of;
use owo_colors::OwoColorize;
use serde_json::Value;

use super::{App, records_of};
use crate::render::render_lesson;

pub struct GenerateArgs {
    pub package: String,
    pub series: String,
    pub class: Option<String>,
    pub title: String,
    pub start_date: String,
    pub time: String,
    pub interval: i64,
    pub count: u32,
    pub duration: i64,
    pub trainers: Vec<String>,
    pub location: String,
}

pub async fn generate(args: GenerateArgs, push: bool) -> Result<()> {
    let app = App::load()?;

    let start_date = parse_date(&args.start_date).context("Invalid start date")?;
    let start_time = NaiveTime::parse_from_str(args.time.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{}', expected HH:MM", args.time))?;

    let outcomes = app
        .fetch(&[Collection::Pakketten, Collection::Reeksen, Collection::Lessen])
        .await;
    let mut packages = records_of(&outcomes, Collection::Pakketten);
    let mut series = records_of(&outcomes, Collection::Reeksen);
    let mut lessons = records_of(&outcomes, Collection::Lessen);

    let mut catalog = Catalog::from_records(&packages, &series);
    let plan = SeriesPlan {
        title: args.title,
        series_name: args.series,
        package_name: args.package,
        class_id: args.class,
        start_date,
        start_time,
        interval_days: args.interval,
        count: args.count,
        duration_minutes: args.duration,
        trainers: args.trainers,
        location: Location {
            name: args.location.trim().to_string(),
            maps_url: None,
        },
    };
    let generated = generate_series(&plan, &mut catalog).context("Invalid series plan")?;

    let new_package = !packages
        .iter()
        .any(|r| id_of(r).as_deref() == Some(generated.package.id.as_str()));
    let new_series = !series
        .iter()
        .any(|r| id_of(r).as_deref() == Some(generated.series.id.as_str()));

    if new_package {
        packages.push(generated.package.to_record());
        app.save(Collection::Pakketten, packages);
    }
    if new_series {
        series.push(generated.series.to_record());
        app.save(Collection::Reeksen, series);
    }
    lessons.extend(generated.lessons.iter().map(|l| l.to_record()));
    app.save(Collection::Lessen, lessons);

    println!(
        "{} {} / {}{}",
        "Series".bold(),
        generated.package.name,
        generated.series.name,
        if new_series { " (new)".green().to_string() } else { String::new() }
    );
    for lesson in &generated.lessons {
        println!("  {}", render_lesson(lesson, Some(&generated.series.name)));
    }

    if push {
        if new_package {
            app.push(true, Collection::Pakketten, "add", Value::Object(generated.package.to_record()))
                .await;
        }
        if new_series {
            app.push(true, Collection::Reeksen, "add", Value::Object(generated.series.to_record()))
                .await;
        }
        for lesson in &generated.lessons {
            app.push(true, Collection::Lessen, "add", Value::Object(lesson.to_record()))
                .await;
        }
    }

    Ok(())
}
