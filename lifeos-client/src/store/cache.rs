/// Snapshot cache
///
/// The store's cache lives inside a [`watch`] channel: the channel value is the
/// single copy of the data, the store writes it, views read it. Every write
/// goes through a [`SessionCache`] which is bound to one session epoch and
/// owner; writes from a store whose epoch has been superseded are dropped.

use lifeos_shared::models::{InboxItem, Task};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::ranking;

/// Per-collection load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing fetched (signed out or not started)
    #[default]
    Uninitialized,

    /// Initial fetch in flight
    Loading,

    /// Fetched at least once
    Ready,
}

/// Records held by id
pub trait Keyed {
    /// Record ID
    fn key(&self) -> Uuid;
}

impl Keyed for InboxItem {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Task {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// One cached collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState<T> {
    /// Load state
    pub state: LoadState,

    /// Records, newest first
    pub items: Vec<T>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        CollectionState {
            state: LoadState::Uninitialized,
            items: Vec::new(),
        }
    }
}

impl<T: Keyed> CollectionState<T> {
    /// Checks if the collection has been fetched
    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// Looks up a record by id
    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    pub(crate) fn mark_loading(&mut self) {
        if self.state == LoadState::Uninitialized {
            self.state = LoadState::Loading;
        }
    }

    /// Replaces the whole collection with a fresh fetch
    pub(crate) fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.state = LoadState::Ready;
    }

    /// Prepends a new record, or replaces it in place if a refetch got there
    /// first
    pub(crate) fn upsert_front(&mut self, record: T) {
        match self.items.iter_mut().find(|item| item.key() == record.key()) {
            Some(existing) => *existing = record,
            None => self.items.insert(0, record),
        }
    }

    /// Replaces a record in place; a record no longer cached stays gone
    pub(crate) fn update(&mut self, record: T) {
        if let Some(existing) = self.items.iter_mut().find(|item| item.key() == record.key()) {
            *existing = record;
        }
    }

    pub(crate) fn remove(&mut self, id: Uuid) {
        self.items.retain(|item| item.key() != id);
    }
}

/// Published state of the cache
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Session generation this snapshot belongs to
    pub epoch: u64,

    /// Signed-in user whose records these are
    pub owner: Option<Uuid>,

    /// Inbox, newest first
    pub inbox: CollectionState<InboxItem>,

    /// Tasks, newest first
    pub tasks: CollectionState<Task>,
}

impl Snapshot {
    /// Empty snapshot for a new epoch
    pub fn new(epoch: u64, owner: Option<Uuid>) -> Self {
        Snapshot {
            epoch,
            owner,
            ..Snapshot::default()
        }
    }

    /// Checks if both collections have been fetched
    pub fn is_loaded(&self) -> bool {
        self.inbox.is_ready() && self.tasks.is_ready()
    }

    /// Checks if either collection is still loading
    pub fn is_loading(&self) -> bool {
        self.inbox.state == LoadState::Loading || self.tasks.state == LoadState::Loading
    }

    /// Best pending task to do next
    pub fn next_task(&self) -> Option<&Task> {
        ranking::next_task(&self.tasks.items)
    }
}

/// Snapshot channel shared by the app and its stores
#[derive(Debug, Clone)]
pub struct Snapshots {
    tx: Arc<watch::Sender<Snapshot>>,
}

impl Default for Snapshots {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshots {
    /// Creates a channel holding an empty, signed-out snapshot
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Snapshots { tx: Arc::new(tx) }
    }

    /// Subscribes to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Copy of the current snapshot
    pub fn current(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Starts a new session epoch, clearing all cached records
    ///
    /// Returns the new epoch. Every [`SessionCache`] bound to an earlier
    /// epoch stops being able to write.
    pub fn begin_epoch(&self, owner: Option<Uuid>) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|snapshot| {
            epoch = snapshot.epoch + 1;
            *snapshot = Snapshot::new(epoch, owner);
        });
        tracing::debug!(epoch, owner = ?owner, "Session epoch started");
        epoch
    }

    pub(crate) fn scope(&self, epoch: u64, owner: Uuid) -> SessionCache {
        SessionCache {
            tx: self.tx.clone(),
            epoch,
            owner,
        }
    }
}

/// Write handle bound to one epoch and owner
#[derive(Debug, Clone)]
pub(crate) struct SessionCache {
    tx: Arc<watch::Sender<Snapshot>>,
    epoch: u64,
    owner: Uuid,
}

impl SessionCache {
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    fn owns(&self, snapshot: &Snapshot) -> bool {
        snapshot.epoch == self.epoch && snapshot.owner == Some(self.owner)
    }

    /// Checks if this epoch is still the published one
    pub(crate) fn is_current(&self) -> bool {
        self.owns(&self.tx.borrow())
    }

    /// Reads the snapshot if this epoch is still current
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> Option<R> {
        let snapshot = self.tx.borrow();
        if self.owns(&snapshot) {
            Some(f(&snapshot))
        } else {
            None
        }
    }

    /// Applies a write if this epoch is still current
    ///
    /// Returns `false` (and logs) if the write was discarded.
    pub(crate) fn apply(&self, what: &str, f: impl FnOnce(&mut Snapshot)) -> bool {
        let applied = self.tx.send_if_modified(|snapshot| {
            if !self.owns(snapshot) {
                return false;
            }
            f(snapshot);
            true
        });

        if !applied {
            tracing::debug!(epoch = self.epoch, what, "Discarding stale update");
        }
        applied
    }
}
