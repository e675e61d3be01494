/// Remote service contracts
///
/// LifeOS delegates persistence, authentication and change notification to a
/// hosted backend. This module defines the two contracts the client relies
/// on and ships two backends for them.
///
/// # Contracts
///
/// - [`DataService`]: owner-scoped CRUD on the `inbox` and `tasks`
///   collections plus a per-owner, per-collection change stream
/// - [`AuthService`]: current session, password sign-in, sign-out and a
///   session-changed stream
///
/// # Backends
///
/// - [`memory`]: in-process backend (tests, demo mode)
/// - [`rest`]: PostgREST/GoTrue HTTP backend
///
/// # Change Notifications
///
/// ```text
/// mutation ──> backend ──> ChangeEvent { collection, kind, owner }
///                              │
///                              └──> every subscriber of (collection, owner)
/// ```
///
/// Subscribers treat events as opaque "something changed" signals.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use uuid::Uuid;

use crate::auth::jwt::JwtError;
use crate::auth::{Session, SignInRequest};
use crate::models::{InboxItem, NewInboxItem, NewTask, Task};

/// Remote service error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Missing, expired or revoked credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Record does not exist (or is not visible to this user)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with the record's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by the service
    #[error("Rejected by service: {0}")]
    Rejected(String),

    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Failure injected by the in-process backend
    #[error("Injected failure: {0}")]
    Injected(String),
}

/// Remote result type alias
pub type RemoteResult<T> = Result<T, RemoteError>;

impl From<JwtError> for RemoteError {
    fn from(err: JwtError) -> Self {
        RemoteError::Unauthorized(err.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Captured notes
    Inbox,

    /// Tasks
    Tasks,
}

impl Collection {
    /// Table name on the service
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Inbox => "inbox",
            Collection::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// What kind of change happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Row inserted
    Insert,

    /// Row updated
    Update,

    /// Row deleted
    Delete,

    /// Unknown change (missed notifications or a polling tick)
    Resync,
}

/// Opaque change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Collection that changed
    pub collection: Collection,

    /// Change kind
    pub kind: ChangeKind,

    /// Owner whose rows changed
    pub owner: Uuid,
}

impl ChangeEvent {
    /// Creates a change event
    pub fn new(collection: Collection, kind: ChangeKind, owner: Uuid) -> Self {
        ChangeEvent {
            collection,
            kind,
            owner,
        }
    }

    /// Creates a resync event
    pub fn resync(collection: Collection, owner: Uuid) -> Self {
        ChangeEvent::new(collection, ChangeKind::Resync, owner)
    }
}

/// Stream of change notifications for one (collection, owner) pair
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;

/// Session state change reported by the session service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session became active
    SignedIn(Session),

    /// The session ended (sign-out, revocation or expiry)
    SignedOut,
}

/// Owner-scoped data contract
///
/// Every call presents the caller's session; the service scopes reads and
/// writes to `session.user_id()`.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Lists the owner's inbox, newest first
    async fn list_inbox(&self, session: &Session) -> RemoteResult<Vec<InboxItem>>;

    /// Inserts an inbox item, returning the stored record
    async fn insert_inbox(&self, session: &Session, item: &NewInboxItem)
        -> RemoteResult<InboxItem>;

    /// Deletes an inbox item
    ///
    /// Fails with [`RemoteError::NotFound`] if no such item exists for the owner.
    async fn delete_inbox(&self, session: &Session, id: Uuid) -> RemoteResult<()>;

    /// Lists the owner's tasks, newest first
    async fn list_tasks(&self, session: &Session) -> RemoteResult<Vec<Task>>;

    /// Inserts a pending task, returning the stored record
    async fn insert_task(&self, session: &Session, task: &NewTask) -> RemoteResult<Task>;

    /// Marks a task completed, returning the updated record
    async fn complete_task(&self, session: &Session, id: Uuid) -> RemoteResult<Task>;

    /// Deletes a task
    async fn delete_task(&self, session: &Session, id: Uuid) -> RemoteResult<()>;

    /// Subscribes to change notifications for one collection of one owner
    fn changes(&self, collection: Collection, owner: Uuid) -> ChangeStream;
}

/// Session contract
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Returns the current session, if any
    async fn get_session(&self) -> RemoteResult<Option<Session>>;

    /// Signs in with email and password
    async fn sign_in_with_password(&self, request: &SignInRequest) -> RemoteResult<Session>;

    /// Ends the current session
    async fn sign_out(&self) -> RemoteResult<()>;

    /// Subscribes to session changes
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}
