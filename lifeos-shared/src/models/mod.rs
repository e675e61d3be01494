/// Domain models for LifeOS
///
/// This module contains the records the remote data service stores for each
/// user, and the typed building blocks they are made of.
///
/// # Models
///
/// - `inbox_item`: Unstructured captured notes awaiting triage
/// - `task`: Prioritized, categorized units of work
/// - `priority`: The 1-5 priority scale
/// - `category`: The fixed category set
///
/// # Example
///
/// ```
/// use lifeos_shared::models::{Category, NewTask, Priority};
/// use validator::Validate;
///
/// let new_task = NewTask::new("Book dentist", Priority::new(4).unwrap(), Category::Health);
/// assert!(new_task.validate().is_ok());
/// ```

pub mod category;
pub mod inbox_item;
pub mod priority;
pub mod task;

pub use category::Category;
pub use inbox_item::{InboxItem, NewInboxItem};
pub use priority::Priority;
pub use task::{NewTask, Task, TaskStatus};

use validator::ValidationError;

/// Rejects strings that are empty or contain only whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}
