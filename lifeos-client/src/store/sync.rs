/// Store synchronization
///
/// Keeps a store's cache converged with the service:
///
/// 1. Subscribe to change notifications for both collections
/// 2. Fetch both collections and mark them ready
/// 3. On every notification, refetch that collection and replace it
///
/// Notifications carry no payload; a full refetch is the only reaction. A
/// lagged subscriber arrives here as a resync event and is handled the same
/// way.

use lifeos_shared::auth::Session;
use lifeos_shared::remote::{ChangeStream, Collection, DataService, RemoteResult};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::cache::SessionCache;

/// Everything a sync task needs, cheap to clone
#[derive(Clone)]
pub(crate) struct SyncContext {
    pub(crate) data: Arc<dyn DataService>,
    pub(crate) session: Session,
    pub(crate) cache: SessionCache,
}

impl SyncContext {
    /// Refetches one collection and replaces it in the cache
    pub(crate) async fn refetch(&self, collection: Collection) -> RemoteResult<()> {
        match collection {
            Collection::Inbox => {
                let items = self.data.list_inbox(&self.session).await?;
                self.cache
                    .apply("inbox refetch", |s| s.inbox.replace(items));
            }
            Collection::Tasks => {
                let tasks = self.data.list_tasks(&self.session).await?;
                self.cache
                    .apply("tasks refetch", |s| s.tasks.replace(tasks));
            }
        }
        Ok(())
    }

    async fn refetch_logged(&self, collection: Collection) {
        if let Err(e) = self.refetch(collection).await {
            tracing::error!(
                user_id = %self.session.user_id(),
                collection = %collection,
                error = %e,
                "Refetch failed"
            );
        }
    }
}

/// Starts the initial load and both change listeners
///
/// All spawned tasks stop when `shutdown` is cancelled.
pub(crate) fn spawn(context: SyncContext, shutdown: CancellationToken) {
    let owner = context.session.user_id();

    // Subscribe before fetching so a change during the fetch is not lost
    let inbox_changes = context.data.changes(Collection::Inbox, owner);
    let task_changes = context.data.changes(Collection::Tasks, owner);

    context.cache.apply("load start", |s| {
        s.inbox.mark_loading();
        s.tasks.mark_loading();
    });

    tokio::spawn(initial_load(context.clone(), shutdown.clone()));
    tokio::spawn(listen_loop(
        context.clone(),
        Collection::Inbox,
        inbox_changes,
        shutdown.clone(),
    ));
    tokio::spawn(listen_loop(context, Collection::Tasks, task_changes, shutdown));
}

async fn initial_load(context: SyncContext, shutdown: CancellationToken) {
    let user_id = context.session.user_id();
    tracing::info!(user_id = %user_id, "Loading inbox and tasks");

    let load = async {
        let (inbox, tasks) = futures::join!(
            context.data.list_inbox(&context.session),
            context.data.list_tasks(&context.session),
        );

        // A failed fetch leaves the collection empty but ready
        let inbox = inbox.unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to fetch inbox");
            Vec::new()
        });
        let tasks = tasks.unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to fetch tasks");
            Vec::new()
        });

        let (inbox_count, task_count) = (inbox.len(), tasks.len());
        let applied = context.cache.apply("initial load", |s| {
            s.inbox.replace(inbox);
            s.tasks.replace(tasks);
        });

        if applied {
            tracing::info!(
                user_id = %user_id,
                inbox = inbox_count,
                tasks = task_count,
                "Initial load complete"
            );
        }
    };

    tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::debug!(user_id = %user_id, "Initial load abandoned");
        }
        _ = load => {}
    }
}

async fn listen_loop(
    context: SyncContext,
    collection: Collection,
    mut changes: ChangeStream,
    shutdown: CancellationToken,
) {
    tracing::debug!(
        user_id = %context.session.user_id(),
        collection = %collection,
        "Listening for changes"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(collection = %collection, "Change listener stopped");
                break;
            }
            event = changes.next() => {
                match event {
                    Some(event) => {
                        tracing::debug!(
                            collection = %collection,
                            kind = ?event.kind,
                            "Change notification, refetching"
                        );
                        context.refetch_logged(collection).await;
                    }
                    None => {
                        tracing::warn!(collection = %collection, "Change stream ended");
                        break;
                    }
                }
            }
        }
    }
}
