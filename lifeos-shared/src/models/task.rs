/// Task model
///
/// This module provides the Task model representing a prioritized,
/// categorized unit of work. Tasks are created directly or by converting an
/// inbox item.
///
/// # State Machine
///
/// ```text
/// pending → completed
/// ```
///
/// Completion is one-way; there is no reopening.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES auth.users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     priority SMALLINT NOT NULL CHECK (priority BETWEEN 1 AND 5),
///     category TEXT NOT NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```
/// use lifeos_shared::models::{Category, NewTask, Priority, TaskStatus};
///
/// let new_task = NewTask::new("  Deploy app ", Priority::new(5).unwrap(), Category::Work);
/// assert_eq!(new_task.title, "Deploy app");
/// assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Category, Priority};

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is waiting to be done
    #[default]
    Pending,

    /// Task is done
    Completed,
}

impl TaskStatus {
    /// Converts status to string for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    /// Checks if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!((self, target), (TaskStatus::Pending, TaskStatus::Completed))
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Task title
    pub title: String,

    /// Priority (1-5, 5 = highest)
    pub priority: Priority,

    /// Category
    pub category: Category,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created (server clock)
    pub created_at: DateTime<Utc>,

    /// When the task was completed (server clock), present iff completed
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Checks if the task is still pending
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Checks the completion invariant: `completed_at` is set iff completed
    pub fn is_consistent(&self) -> bool {
        self.status.is_terminal() == self.completed_at.is_some()
    }

    /// Marks the task completed at the given instant
    ///
    /// Returns `false` (and leaves the task untouched) if the task was already
    /// completed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(TaskStatus::Completed) {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
        true
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewTask {
    /// Task title, trimmed
    #[validate(custom(function = "crate::models::validate_not_blank"))]
    pub title: String,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Category
    #[serde(default)]
    pub category: Category,
}

impl NewTask {
    /// Builds a task request, trimming surrounding whitespace from the title
    pub fn new(title: &str, priority: Priority, category: Category) -> Self {
        NewTask {
            title: title.trim().to_string(),
            priority,
            category,
        }
    }
}
