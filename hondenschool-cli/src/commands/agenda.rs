use anyhow::{Context, Result};
use hondenschool_core::Collection;
use hondenschool_core::entity::{DATE_FORMAT, Lesson, Notice, build_agenda, parse_date};
use owo_colors::OwoColorize;

use super::{App, records_of};
use crate::render::Render;

pub async fn run(from: Option<&str>) -> Result<()> {
    // Agenda dates are zero-padded, so a date prefix compares correctly
    // against both lesson timestamps and notice dates.
    let from = match from {
        Some(f) => Some(
            parse_date(f)
                .context("Invalid --from date")?
                .format(DATE_FORMAT)
                .to_string(),
        ),
        None => None,
    };

    let app = App::load()?;
    let outcomes = app
        .fetch(&[Collection::Lessen, Collection::Mededelingen])
        .await;

    let lessons: Vec<Lesson> = records_of(&outcomes, Collection::Lessen)
        .iter()
        .filter_map(Lesson::from_record)
        .collect();
    let notices: Vec<Notice> = records_of(&outcomes, Collection::Mededelingen)
        .iter()
        .filter_map(Notice::from_record)
        .collect();

    let items: Vec<_> = build_agenda(&lessons, &notices)
        .into_iter()
        .filter(|item| from.as_deref().is_none_or(|f| item.date.as_str() >= f))
        .collect();

    if items.is_empty() {
        println!("{}", "Nothing on the agenda".dimmed());
        return Ok(());
    }

    for item in &items {
        println!("{}", item.render());
    }

    Ok(())
}
