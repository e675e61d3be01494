/// Completed tasks view

use lifeos_shared::models::Task;
use std::cmp::Reverse;

use crate::store::Snapshot;

/// Completed screen data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedView {
    /// Completed tasks, most recently completed first
    pub tasks: Vec<Task>,

    /// Initial fetch in flight
    pub loading: bool,
}

impl CompletedView {
    /// Derives the view from a snapshot
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut tasks: Vec<Task> = snapshot
            .tasks
            .items
            .iter()
            .filter(|t| !t.is_pending())
            .cloned()
            .collect();
        tasks.sort_by_key(|t| Reverse(t.completed_at));

        CompletedView {
            tasks,
            loading: !snapshot.tasks.is_ready(),
        }
    }

    /// Number of completed tasks
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Loaded and nothing completed yet
    pub fn is_empty(&self) -> bool {
        !self.loading && self.tasks.is_empty()
    }
}
