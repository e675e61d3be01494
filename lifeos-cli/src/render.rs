/// Plain-text screens
///
/// Each function turns a view into the text the terminal shows, plus the ids
/// in display order so that `<ref>` positions line up with what was printed.

use chrono::{DateTime, Local, Utc};
use lifeos_client::views::{CompletedView, InboxView, PriorityBoard, TodayFocus};
use lifeos_shared::models::Task;
use std::fmt::Write;
use uuid::Uuid;

use crate::refs::short_id;

/// Rendered screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Text to print
    pub text: String,

    /// Listed ids, in display order
    pub ids: Vec<Uuid>,
}

impl Screen {
    fn plain(text: String) -> Self {
        Screen {
            text,
            ids: Vec::new(),
        }
    }
}

const LOADING: &str = "Loading...";

fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d %H:%M").to_string()
}

fn task_line(out: &mut String, position: usize, task: &Task) {
    let _ = writeln!(
        out,
        "{:>3}. {} {}  [{}]  {}",
        position,
        task.priority.stars(),
        task.title,
        task.category,
        short_id(task.id)
    );
}

/// Capture inbox
pub fn inbox(view: &InboxView) -> Screen {
    if view.loading {
        return Screen::plain(LOADING.to_string());
    }
    if view.is_empty() {
        return Screen::plain("Inbox is empty. Capture something with `capture <text>`.".to_string());
    }

    let mut text = format!("Inbox ({})\n", view.items.len());
    for (i, item) in view.items.iter().enumerate() {
        let _ = writeln!(
            text,
            "{:>3}. {}  ({}, {})",
            i + 1,
            item.text,
            timestamp(item.created_at),
            short_id(item.id)
        );
    }

    Screen {
        text,
        ids: view.items.iter().map(|i| i.id).collect(),
    }
}

/// Priority board
pub fn board(view: &PriorityBoard) -> Screen {
    if view.loading {
        return Screen::plain(LOADING.to_string());
    }

    let mut text = format!("Priorities: {} ({})\n", view.filter, view.tasks.len());
    if view.is_empty() {
        text.push_str("No pending tasks.\n");
    }
    for (i, task) in view.tasks.iter().enumerate() {
        task_line(&mut text, i + 1, task);
    }

    Screen {
        text,
        ids: view.tasks.iter().map(|t| t.id).collect(),
    }
}

/// Today's focus
///
/// The next task is position 1, up-next tasks follow.
pub fn today(view: &TodayFocus) -> Screen {
    if view.loading {
        return Screen::plain(LOADING.to_string());
    }

    let mut text = String::new();
    let mut ids = Vec::new();

    match &view.next {
        Some(next) => {
            text.push_str("Next up:\n");
            task_line(&mut text, 1, next);
            ids.push(next.id);
        }
        None => text.push_str("Nothing pending. Enjoy the day.\n"),
    }

    if !view.up_next.is_empty() {
        text.push_str("\nAfter that:\n");
        for task in &view.up_next {
            ids.push(task.id);
            task_line(&mut text, ids.len(), task);
        }
    }

    let _ = write!(
        text,
        "\n{} pending, {} completed today\n",
        view.pending_count, view.completed_today
    );

    Screen { text, ids }
}

/// Completed tasks
pub fn completed(view: &CompletedView) -> Screen {
    if view.loading {
        return Screen::plain(LOADING.to_string());
    }
    if view.is_empty() {
        return Screen::plain("No completed tasks yet.".to_string());
    }

    let mut text = format!("Completed ({})\n", view.count());
    for (i, task) in view.tasks.iter().enumerate() {
        let done = task.completed_at.map(timestamp).unwrap_or_default();
        let _ = writeln!(
            text,
            "{:>3}. {}  [{}]  {}  {}",
            i + 1,
            task.title,
            task.category,
            done,
            short_id(task.id)
        );
    }

    Screen {
        text,
        ids: view.tasks.iter().map(|t| t.id).collect(),
    }
}
