//! Terminal rendering for hondenschool-core types.
//!
//! Extension traits that add colored output using owo_colors.

use hondenschool_core::entity::{AgendaItem, AgendaKind, Lesson};
use hondenschool_core::loader::{LoadOutcome, Source};
use hondenschool_core::store::{INACTIEF, MigrationReport, Persistence};
use owo_colors::OwoColorize;

/// Shown for references that resolve to nothing.
pub const MISSING: &str = "—";

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Source {
    fn render(&self) -> String {
        match self {
            Source::Remote => self.to_string().green().to_string(),
            Source::Static => self.to_string().yellow().to_string(),
            Source::Local => self.to_string().red().to_string(),
        }
    }
}

impl Render for Persistence {
    fn render(&self) -> String {
        match self {
            Persistence::Persisted => String::new(),
            Persistence::Degraded(reason) => {
                format!("(not saved locally: {reason})").red().to_string()
            }
        }
    }
}

impl Render for LoadOutcome {
    fn render(&self) -> String {
        let mut line = format!(
            "{:<14} {:>4} from {}",
            self.collection.to_string().bold(),
            self.records.len(),
            self.source.render()
        );
        if let Some(persistence) = &self.persistence {
            let note = persistence.render();
            if !note.is_empty() {
                line.push(' ');
                line.push_str(&note);
            }
        }
        line
    }
}

impl Render for AgendaItem {
    fn render(&self) -> String {
        let marker = match self.kind {
            AgendaKind::Lesson => "●".blue().to_string(),
            AgendaKind::Notice => "!".yellow().bold().to_string(),
        };
        let date = self.date.replace('T', " ");
        match &self.detail {
            Some(detail) => format!(
                "{} {:<16} {} {}",
                marker,
                date.dimmed(),
                self.title,
                detail.dimmed()
            ),
            None => format!("{} {:<16} {}", marker, date.dimmed(), self.title),
        }
    }
}

impl Render for MigrationReport {
    fn render(&self) -> String {
        match self {
            MigrationReport::AlreadyMigrated => "Legacy data was already migrated".dimmed().to_string(),
            MigrationReport::NoLegacyData => "No legacy data found".dimmed().to_string(),
            MigrationReport::Migrated { buckets, records } => format!(
                "Migrated {} records into {} buckets",
                records.green(),
                buckets.green()
            ),
            MigrationReport::Failed(reason) => format!("Migration failed: {reason}").red().to_string(),
        }
    }
}

/// One lesson line, with its series name resolved by the caller.
pub fn render_lesson(lesson: &Lesson, series_name: Option<&str>) -> String {
    let when = lesson.start_timestamp.replace('T', " ");
    let end_time = lesson.end_timestamp.split('T').nth(1).unwrap_or(MISSING);
    let trainers = if lesson.trainers.is_empty() {
        MISSING.to_string()
    } else {
        lesson.trainers.join(", ")
    };
    let location = if lesson.location.name.is_empty() {
        MISSING
    } else {
        lesson.location.name.as_str()
    };

    let title = if lesson.status == INACTIEF {
        lesson.title.strikethrough().dimmed().to_string()
    } else {
        lesson.title.clone()
    };

    format!(
        "{}-{} {}  {}  {}  {}  {}",
        when,
        end_time,
        title,
        series_name.unwrap_or(MISSING).cyan(),
        location,
        trainers.dimmed(),
        lesson.id.dimmed()
    )
}
