use serde::Serialize;

use super::{Lesson, Notice};
use crate::store::INACTIEF;

pub const LESSON_COLOR: &str = "#2563eb";
const INACTIVE_LESSON_COLOR: &str = "#9ca3af";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaKind {
    Lesson,
    Notice,
}

/// One line of the merged agenda feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaItem {
    pub kind: AgendaKind,
    pub id: String,
    /// Lesson start or notice date; also the sort key.
    pub date: String,
    pub title: String,
    pub detail: Option<String>,
    pub color: String,
}

/// Merge lessons and notices into one chronological feed.
///
/// Dates are compared as strings. That is only correct because both
/// `YYYY-MM-DDTHH:MM` and `YYYY-MM-DD` are zero-padded and fixed-width; a
/// notice sorts before the lessons of the same day.
pub fn build_agenda(lessons: &[Lesson], notices: &[Notice]) -> Vec<AgendaItem> {
    let lesson_items = lessons.iter().map(|lesson| {
        let color = if lesson.status == INACTIEF {
            INACTIVE_LESSON_COLOR
        } else {
            LESSON_COLOR
        };
        let detail = Some(lesson.location.name.clone())
            .filter(|n| !n.is_empty())
            .into_iter()
            .chain((!lesson.trainers.is_empty()).then(|| lesson.trainers.join(", ")))
            .collect::<Vec<_>>()
            .join(" · ");

        AgendaItem {
            kind: AgendaKind::Lesson,
            id: lesson.id.clone(),
            date: lesson.start_timestamp.clone(),
            title: lesson.title.clone(),
            detail: (!detail.is_empty()).then_some(detail),
            color: color.to_string(),
        }
    });

    let notice_items = notices.iter().map(|notice| AgendaItem {
        kind: AgendaKind::Notice,
        id: notice.id.clone(),
        date: notice.date_iso.clone(),
        title: if notice.title.is_empty() {
            notice.message.clone()
        } else {
            notice.title.clone()
        },
        detail: (!notice.title.is_empty() && !notice.message.is_empty())
            .then(|| notice.message.clone()),
        color: notice.color.clone(),
    });

    let mut items: Vec<AgendaItem> = lesson_items.chain(notice_items).collect();
    items.sort_by(|a, b| a.date.cmp(&b.date));
    items
}
