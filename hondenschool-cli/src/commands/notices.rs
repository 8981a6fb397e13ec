use anyhow::{Context, Result};
use chrono::Local;
use hondenschool_core::Collection;
use hondenschool_core::entity::{DATE_FORMAT, NoticeInput, build_notice};
use owo_colors::OwoColorize;
use serde_json::Value;

use super::{App, records_of};

pub async fn add(
    title: Option<String>,
    message: String,
    date: Option<String>,
    color: Option<String>,
    push: bool,
) -> Result<()> {
    let app = App::load()?;

    let notice = build_notice(NoticeInput {
        title: title.unwrap_or_default(),
        message,
        date: date.unwrap_or_else(|| Local::now().format(DATE_FORMAT).to_string()),
        color,
        ..Default::default()
    })
    .context("Invalid notice")?;

    let outcomes = app.fetch(&[Collection::Mededelingen]).await;
    let mut notices = records_of(&outcomes, Collection::Mededelingen);
    let record = notice.to_record();
    notices.push(record.clone());
    app.save(Collection::Mededelingen, notices);

    println!(
        "{} notice for {} added {}",
        "✓".green(),
        notice.date_iso,
        notice.id.dimmed()
    );

    app.push(push, Collection::Mededelingen, "add", Value::Object(record))
        .await;

    Ok(())
}
