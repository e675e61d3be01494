/// Priority board view
///
/// Pending tasks, optionally narrowed to one category, highest priority first.
/// The sort is stable, so within one priority tasks keep the store's
/// newest-first order.

use lifeos_shared::models::{Category, Task};
use std::fmt;
use std::str::FromStr;

use crate::store::ranking;
use crate::store::Snapshot;

/// Category filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every category
    #[default]
    All,

    /// A single category
    Only(Category),
}

impl CategoryFilter {
    /// Checks if `task` passes the filter
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => task.category == *category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = lifeos_shared::models::category::UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

/// Priority board screen data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityBoard {
    /// Active filter
    pub filter: CategoryFilter,

    /// Pending tasks passing the filter, highest priority first
    pub tasks: Vec<Task>,

    /// Initial fetch in flight
    pub loading: bool,
}

impl PriorityBoard {
    /// Derives the board from a snapshot
    pub fn from_snapshot(snapshot: &Snapshot, filter: CategoryFilter) -> Self {
        let mut tasks: Vec<Task> = snapshot
            .tasks
            .items
            .iter()
            .filter(|t| t.is_pending() && filter.matches(t))
            .cloned()
            .collect();
        ranking::sort_by_priority(&mut tasks);

        PriorityBoard {
            filter,
            tasks,
            loading: !snapshot.tasks.is_ready(),
        }
    }

    /// Loaded and nothing to show
    pub fn is_empty(&self) -> bool {
        !self.loading && self.tasks.is_empty()
    }
}
