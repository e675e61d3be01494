/// Capture inbox view

use lifeos_shared::models::{Category, InboxItem, Priority, Task};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{Snapshot, TaskStore};

/// Inbox screen data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxView {
    /// Items, newest first
    pub items: Vec<InboxItem>,

    /// Initial fetch in flight
    pub loading: bool,
}

impl InboxView {
    /// Derives the view from a snapshot
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        InboxView {
            items: snapshot.inbox.items.clone(),
            loading: !snapshot.inbox.is_ready(),
        }
    }

    /// Loaded and nothing captured
    pub fn is_empty(&self) -> bool {
        !self.loading && self.items.is_empty()
    }
}

/// Inline "convert to task" form state
///
/// At most one item is expanded at a time. Choosing the expanded item again
/// collapses it. Priority and category keep their values while switching
/// items and go back to the defaults after a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversionForm {
    expanded: Option<Uuid>,

    /// Selected priority
    pub priority: Priority,

    /// Selected category
    pub category: Category,
}

impl ConversionForm {
    /// Creates a collapsed form with default choices
    pub fn new() -> Self {
        Self::default()
    }

    /// Item currently expanded
    pub fn expanded(&self) -> Option<Uuid> {
        self.expanded
    }

    /// Checks if `id` is the expanded item
    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded == Some(id)
    }

    /// Expands `id`, or collapses it if it is already expanded
    pub fn toggle(&mut self, id: Uuid) {
        self.expanded = if self.is_expanded(id) { None } else { Some(id) };
    }

    /// Collapses and restores the default choices
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Converts the expanded item with the selected choices
    ///
    /// The form resets only on success.
    ///
    /// # Errors
    ///
    /// `NotFound` if no item is expanded, otherwise whatever
    /// [`TaskStore::convert_to_task`] returns.
    pub async fn submit(&mut self, store: &TaskStore) -> StoreResult<Task> {
        let id = self
            .expanded
            .ok_or_else(|| StoreError::NotFound("No inbox item selected".to_string()))?;

        let task = store.convert_to_task(id, self.priority, self.category).await?;
        self.reset();
        Ok(task)
    }
}
