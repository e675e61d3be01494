/// Today's focus view
///
/// The single next task, what follows it, and two counters. "Today" is the
/// local calendar day of the supplied clock.

use chrono::{DateTime, Local, TimeZone};
use lifeos_shared::models::{Task, TaskStatus};

use crate::store::ranking;
use crate::store::Snapshot;

/// How many tasks "up next" shows
pub const UP_NEXT_LIMIT: usize = 3;

/// Today screen data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayFocus {
    /// Best pending task
    pub next: Option<Task>,

    /// Other pending tasks, highest priority first
    pub up_next: Vec<Task>,

    /// Pending task count
    pub pending_count: usize,

    /// Tasks completed on today's calendar day
    pub completed_today: usize,

    /// Initial fetch in flight
    pub loading: bool,
}

impl TodayFocus {
    /// Derives the view using the local clock
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::at(snapshot, Local::now())
    }

    /// Derives the view as of `now`, in `now`'s time zone
    pub fn at<Tz: TimeZone>(snapshot: &Snapshot, now: DateTime<Tz>) -> Self {
        let tasks = &snapshot.tasks.items;
        let next = ranking::next_task(tasks).cloned();

        let mut up_next: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.is_pending() && Some(t.id) != next.as_ref().map(|n| n.id))
            .collect();
        ranking::sort_by_priority(&mut up_next);

        let today = now.date_naive();
        let zone = now.timezone();
        let completed_today = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .filter_map(|t| t.completed_at)
            .filter(|at| at.with_timezone(&zone).date_naive() == today)
            .count();

        TodayFocus {
            next,
            up_next: up_next.into_iter().take(UP_NEXT_LIMIT).cloned().collect(),
            pending_count: tasks.iter().filter(|t| t.is_pending()).count(),
            completed_today,
            loading: !snapshot.tasks.is_ready(),
        }
    }
}
