/// Task store
///
/// Session-scoped cache of one user's inbox and tasks plus the operations
/// that change them. A store is built for exactly one [`Session`] and one
/// epoch; when the session changes the owner drops it and builds a new one.
///
/// # Write Path
///
/// ```text
/// operation ──> local validation ──> DataService ──> cache update ──> snapshot
///                    │ (fails)             │ (fails)
///                    └─> StoreError        └─> StoreError::Remote (logged)
/// ```
///
/// Mutations are not sequenced against each other or against refetches; the
/// last write to the snapshot wins and the next notification-driven refetch
/// converges everything.
///
/// # Conversion
///
/// Converting an inbox item is two remote calls (create task, delete item).
/// If the delete fails the created task is deleted again before the error is
/// returned, so the user sees either a finished conversion or no change. If
/// that compensating delete also fails the error names the orphaned task.

use lifeos_shared::auth::Session;
use lifeos_shared::models::{Category, InboxItem, NewInboxItem, NewTask, Priority, Task};
use lifeos_shared::remote::{Collection, DataService, RemoteError};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use super::cache::{Snapshot, Snapshots};
use super::sync::{self, SyncContext};
use crate::error::{StoreError, StoreResult};

/// Session-scoped task store
pub struct TaskStore {
    sync: SyncContext,
    shutdown: CancellationToken,
}

impl TaskStore {
    /// Builds a store for `session` in `epoch` and starts syncing
    ///
    /// `epoch` must come from [`Snapshots::begin_epoch`] for the same owner.
    /// Must be called from within a Tokio runtime.
    pub fn open(
        data: Arc<dyn DataService>,
        session: Session,
        snapshots: &Snapshots,
        epoch: u64,
    ) -> Self {
        let cache = snapshots.scope(epoch, session.user_id());
        let context = SyncContext {
            data,
            session,
            cache,
        };
        let shutdown = CancellationToken::new();

        sync::spawn(context.clone(), shutdown.clone());

        TaskStore {
            sync: context,
            shutdown,
        }
    }

    /// Session this store serves
    pub fn session(&self) -> &Session {
        &self.sync.session
    }

    /// Epoch this store writes to
    pub fn epoch(&self) -> u64 {
        self.sync.cache.epoch()
    }

    /// Subscribes to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.sync.cache.subscribe()
    }

    /// Current snapshot, if this store's session is still the active one
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.sync.cache.read(Snapshot::clone)
    }

    /// Waits until both collections have loaded
    ///
    /// # Errors
    ///
    /// Returns `SessionEnded` if the session changes first.
    pub async fn ready(&self) -> StoreResult<()> {
        let epoch = self.epoch();
        let mut rx = self.subscribe();

        let current = {
            let snapshot = rx
                .wait_for(|s| s.epoch != epoch || s.is_loaded())
                .await
                .map_err(|_| StoreError::SessionEnded)?;
            snapshot.epoch
        };

        if current == epoch {
            Ok(())
        } else {
            Err(StoreError::SessionEnded)
        }
    }

    /// Stops syncing; later operations fail with `SessionEnded`
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.shutdown.is_cancelled() || !self.sync.cache.is_current() {
            return Err(StoreError::SessionEnded);
        }
        Ok(())
    }

    /// Logs a remote failure and wraps it
    fn remote_failure(&self, operation: &'static str, err: RemoteError) -> StoreError {
        tracing::error!(
            user_id = %self.sync.session.user_id(),
            operation,
            error = %err,
            "Remote operation failed"
        );
        StoreError::Remote(err)
    }

    /// Captures a note into the inbox
    ///
    /// # Errors
    ///
    /// - `Validation` if the text is blank (no request is made)
    /// - `Remote` if the service rejects the insert
    pub async fn add_inbox_item(&self, text: &str) -> StoreResult<InboxItem> {
        let item = NewInboxItem::new(text);
        item.validate()?;
        self.ensure_live()?;

        let record = self
            .sync
            .data
            .insert_inbox(&self.sync.session, &item)
            .await
            .map_err(|e| self.remote_failure("add_inbox_item", e))?;

        self.sync
            .cache
            .apply("add_inbox_item", |s| s.inbox.upsert_front(record.clone()));
        tracing::info!(item_id = %record.id, "Inbox item added");

        Ok(record)
    }

    /// Deletes an inbox item
    pub async fn remove_inbox_item(&self, id: Uuid) -> StoreResult<()> {
        self.ensure_live()?;

        self.sync
            .data
            .delete_inbox(&self.sync.session, id)
            .await
            .map_err(|e| self.remote_failure("remove_inbox_item", e))?;

        self.sync
            .cache
            .apply("remove_inbox_item", |s| s.inbox.remove(id));
        tracing::info!(item_id = %id, "Inbox item removed");

        Ok(())
    }

    /// Turns an inbox item into a pending task
    ///
    /// # Errors
    ///
    /// - `NotReady` if the inbox has not loaded
    /// - `NotFound` if the item is not in the local inbox (no request is made)
    /// - `Remote` if creating the task fails (nothing changed)
    /// - `ConversionRolledBack` if removing the item failed and the task was
    ///   deleted again
    /// - `ConversionIncomplete` if removing the item failed and the task could
    ///   not be deleted
    pub async fn convert_to_task(
        &self,
        id: Uuid,
        priority: Priority,
        category: Category,
    ) -> StoreResult<Task> {
        self.ensure_live()?;

        let text = self
            .sync
            .cache
            .read(|s| {
                if !s.inbox.is_ready() {
                    return Err(StoreError::NotReady);
                }
                s.inbox
                    .get(id)
                    .map(|item| item.text.clone())
                    .ok_or_else(|| StoreError::NotFound(format!("Inbox item {}", id)))
            })
            .ok_or(StoreError::SessionEnded)??;

        let new_task = NewTask::new(&text, priority, category);
        new_task.validate()?;

        let task = self
            .sync
            .data
            .insert_task(&self.sync.session, &new_task)
            .await
            .map_err(|e| self.remote_failure("convert_to_task", e))?;

        // An item already removed elsewhere still counts as moved
        match self.sync.data.delete_inbox(&self.sync.session, id).await {
            Ok(()) | Err(RemoteError::NotFound(_)) => {
                self.sync.cache.apply("convert_to_task", |s| {
                    s.tasks.upsert_front(task.clone());
                    s.inbox.remove(id);
                });
                tracing::info!(item_id = %id, task_id = %task.id, "Inbox item converted");
                Ok(task)
            }
            Err(cause) => {
                tracing::error!(
                    item_id = %id,
                    task_id = %task.id,
                    error = %cause,
                    "Removing converted item failed, deleting created task"
                );
                self.compensate(id, task.id, cause).await
            }
        }
    }

    async fn compensate(&self, item_id: Uuid, task_id: Uuid, cause: RemoteError) -> StoreResult<Task> {
        match self.sync.data.delete_task(&self.sync.session, task_id).await {
            Ok(()) => {
                self.sync
                    .cache
                    .apply("convert_to_task rollback", |s| s.tasks.remove(task_id));
                tracing::warn!(item_id = %item_id, "Conversion rolled back");
                Err(StoreError::ConversionRolledBack(cause))
            }
            Err(e) => {
                tracing::error!(
                    item_id = %item_id,
                    task_id = %task_id,
                    error = %e,
                    "Rollback failed, task left behind"
                );
                Err(StoreError::ConversionIncomplete {
                    task_id,
                    item_id,
                    cause,
                })
            }
        }
    }

    /// Creates a pending task
    ///
    /// # Errors
    ///
    /// - `Validation` if the title is blank (no request is made)
    /// - `Remote` if the service rejects the insert
    pub async fn add_task(
        &self,
        title: &str,
        priority: Priority,
        category: Category,
    ) -> StoreResult<Task> {
        let new_task = NewTask::new(title, priority, category);
        new_task.validate()?;
        self.ensure_live()?;

        let task = self
            .sync
            .data
            .insert_task(&self.sync.session, &new_task)
            .await
            .map_err(|e| self.remote_failure("add_task", e))?;

        self.sync
            .cache
            .apply("add_task", |s| s.tasks.upsert_front(task.clone()));
        tracing::info!(task_id = %task.id, priority = %task.priority, "Task added");

        Ok(task)
    }

    /// Marks a task completed
    ///
    /// The completion time comes from the service.
    pub async fn complete_task(&self, id: Uuid) -> StoreResult<Task> {
        self.ensure_live()?;

        let task = self
            .sync
            .data
            .complete_task(&self.sync.session, id)
            .await
            .map_err(|e| self.remote_failure("complete_task", e))?;

        self.sync
            .cache
            .apply("complete_task", |s| s.tasks.update(task.clone()));
        tracing::info!(task_id = %id, "Task completed");

        Ok(task)
    }

    /// Deletes a task, pending or completed
    pub async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.ensure_live()?;

        self.sync
            .data
            .delete_task(&self.sync.session, id)
            .await
            .map_err(|e| self.remote_failure("delete_task", e))?;

        self.sync.cache.apply("delete_task", |s| s.tasks.remove(id));
        tracing::info!(task_id = %id, "Task deleted");

        Ok(())
    }

    /// Best pending task to work on next
    pub fn next_task(&self) -> Option<Task> {
        self.sync
            .cache
            .read(|s| s.next_task().cloned())
            .flatten()
    }

    /// Refetches both collections
    pub async fn refresh(&self) -> StoreResult<()> {
        self.ensure_live()?;

        let (inbox, tasks) = futures::join!(
            self.sync.refetch(Collection::Inbox),
            self.sync.refetch(Collection::Tasks),
        );
        inbox.map_err(|e| self.remote_failure("refresh", e))?;
        tasks.map_err(|e| self.remote_failure("refresh", e))?;

        Ok(())
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        self.close();
        tracing::debug!(epoch = self.epoch(), "Task store closed");
    }
}
