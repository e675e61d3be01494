/// In-process backend
///
/// [`MemoryServer`] plays the hosted service inside the process: it keeps
/// accounts, sessions and both collections in memory and implements
/// [`DataService`]. [`MemoryClient`] is one client's view of the session
/// service (one per "device"), implementing [`AuthService`].
///
/// # Behaviour
///
/// - Passwords are stored as Argon2id hashes
/// - Sign-in issues an HS256 access token bound to a server-side session ID
/// - Every data call validates the token and scopes rows to its subject
/// - `created_at` / `completed_at` come from the server clock and are strictly
///   increasing
/// - Every successful mutation broadcasts a [`ChangeEvent`]
///
/// # Test Controls
///
/// - [`MemoryServer::fail_next`]: the next matching operation fails
/// - [`MemoryServer::hold_next`]: the next matching operation waits for a
///   release signal after it has been authorized
/// - [`MemoryServer::revoke_sessions`]: signs a user out everywhere
///
/// # Example
///
/// ```no_run
/// use lifeos_shared::auth::SignInRequest;
/// use lifeos_shared::models::NewInboxItem;
/// use lifeos_shared::remote::memory::MemoryServer;
/// use lifeos_shared::remote::{AuthService, DataService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = MemoryServer::new("test-secret-key-at-least-32-bytes-long");
/// server.create_user("me@example.com", "password").await?;
///
/// let client = server.connect().await;
/// let session = client
///     .sign_in_with_password(&SignInRequest::new("me@example.com", "password"))
///     .await?;
///
/// server.insert_inbox(&session, &NewInboxItem::new("Buy milk")).await?;
/// assert_eq!(server.list_inbox(&session).await?.len(), 1);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex, Notify};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;
use validator::Validate;

use super::{
    AuthEvent, AuthService, ChangeEvent, ChangeKind, ChangeStream, Collection, DataService,
    RemoteError, RemoteResult,
};
use crate::auth::jwt::{create_token, validate_token, Claims};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{CurrentUser, Session, SignInRequest};
use crate::models::{InboxItem, NewInboxItem, NewTask, Task, TaskStatus};

/// Change notification buffer per server
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Session event buffer per client
const AUTH_CHANNEL_CAPACITY: usize = 16;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Operations the fault injector can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Password sign-in
    SignIn,
    /// List inbox
    ListInbox,
    /// Insert inbox item
    InsertInbox,
    /// Delete inbox item
    DeleteInbox,
    /// List tasks
    ListTasks,
    /// Insert task
    InsertTask,
    /// Complete task
    CompleteTask,
    /// Delete task
    DeleteTask,
}

/// Pending injected fault
enum Fault {
    /// Fail with [`RemoteError::Injected`]
    Fail(Operation, String),

    /// Wait for the gate before proceeding
    Hold(Operation, Arc<Notify>),
}

impl Fault {
    fn operation(&self) -> Operation {
        match self {
            Fault::Fail(op, _) | Fault::Hold(op, _) => *op,
        }
    }
}

/// Registered account
struct Account {
    user_id: Uuid,
    email: String,
    password_hash: String,
}

/// Mutable server state
#[derive(Default)]
struct ServerState {
    /// Accounts keyed by lowercase email
    accounts: HashMap<String, Account>,

    /// Live session ID -> user ID
    live_sessions: HashMap<Uuid, Uuid>,

    inbox: Vec<InboxItem>,
    tasks: Vec<Task>,

    /// Last timestamp handed out
    last_stamp: Option<DateTime<Utc>>,

    faults: VecDeque<Fault>,
}

impl ServerState {
    /// Server clock, strictly increasing across calls
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn take_fault(&mut self, op: Operation) -> Option<Fault> {
        let pos = self.faults.iter().position(|f| f.operation() == op)?;
        self.faults.remove(pos)
    }
}

struct ServerInner {
    state: Mutex<ServerState>,
    clients: Mutex<Vec<Weak<ClientInner>>>,
    changes: broadcast::Sender<ChangeEvent>,
    jwt_secret: String,
    token_lifetime: Duration,
}

/// In-process data service
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryServer {
    inner: Arc<ServerInner>,
}

impl MemoryServer {
    /// Creates an empty server signing tokens with `jwt_secret`
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self::with_token_lifetime(jwt_secret, Claims::default_expiration())
    }

    /// Creates a server whose access tokens expire `token_lifetime` after
    /// sign-in
    pub fn with_token_lifetime(jwt_secret: impl Into<String>, token_lifetime: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        MemoryServer {
            inner: Arc::new(ServerInner {
                state: Mutex::new(ServerState::default()),
                clients: Mutex::new(Vec::new()),
                changes,
                jwt_secret: jwt_secret.into(),
                token_lifetime,
            }),
        }
    }

    /// Opens a new client (one "device") against this server
    pub async fn connect(&self) -> MemoryClient {
        let (auth_tx, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        let client = Arc::new(ClientInner {
            session: Mutex::new(None),
            auth_tx,
        });

        let mut clients = self.inner.clients.lock().await;
        clients.retain(|c| c.strong_count() > 0);
        clients.push(Arc::downgrade(&client));

        MemoryClient {
            server: self.clone(),
            inner: client,
        }
    }

    /// Registers an account
    ///
    /// # Errors
    ///
    /// - `Rejected` if the email is malformed or the password empty
    /// - `Conflict` if the email is already registered
    pub async fn create_user(&self, email: &str, password: &str) -> RemoteResult<Uuid> {
        let request = SignInRequest::new(email, password);
        request
            .validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid account: {}", e)))?;

        let key = request.email.to_lowercase();
        if self.inner.state.lock().await.accounts.contains_key(&key) {
            return Err(RemoteError::Conflict(format!("Email already registered: {}", key)));
        }

        let secret = request.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&secret))
            .await
            .map_err(|e| RemoteError::Transport(format!("Hashing task failed: {}", e)))?
            .map_err(|e| RemoteError::Rejected(e.to_string()))?;

        let mut state = self.inner.state.lock().await;
        if state.accounts.contains_key(&key) {
            return Err(RemoteError::Conflict(format!("Email already registered: {}", key)));
        }

        let user_id = Uuid::new_v4();
        state.accounts.insert(
            key,
            Account {
                user_id,
                email: request.email,
                password_hash,
            },
        );

        tracing::info!(user_id = %user_id, "Account created");
        Ok(user_id)
    }

    /// Makes the next `op` fail with [`RemoteError::Injected`]
    pub async fn fail_next(&self, op: Operation, message: &str) {
        self.inner
            .state
            .lock()
            .await
            .faults
            .push_back(Fault::Fail(op, message.to_string()));
    }

    /// Makes the next `op` wait, after authorization, until the returned gate
    /// is notified
    pub async fn hold_next(&self, op: Operation) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner
            .state
            .lock()
            .await
            .faults
            .push_back(Fault::Hold(op, gate.clone()));
        gate
    }

    /// Ends every session of `user_id` on every client
    pub async fn revoke_sessions(&self, user_id: Uuid) {
        {
            let mut state = self.inner.state.lock().await;
            state.live_sessions.retain(|_, owner| *owner != user_id);
        }

        let clients = self.inner.clients.lock().await;
        for client in clients.iter().filter_map(Weak::upgrade) {
            let mut current = client.session.lock().await;
            if current.as_ref().map(|c| c.session.user_id()) == Some(user_id) {
                *current = None;
                let _ = client.auth_tx.send(AuthEvent::SignedOut);
            }
        }

        tracing::info!(user_id = %user_id, "Sessions revoked");
    }

    /// Server-side view of a user's inbox, newest first
    pub async fn inbox_of(&self, user_id: Uuid) -> Vec<InboxItem> {
        let state = self.inner.state.lock().await;
        newest_first(state.inbox.iter().filter(|i| i.user_id == user_id).cloned(), |i| {
            i.created_at
        })
    }

    /// Server-side view of a user's tasks, newest first
    pub async fn tasks_of(&self, user_id: Uuid) -> Vec<Task> {
        let state = self.inner.state.lock().await;
        newest_first(state.tasks.iter().filter(|t| t.user_id == user_id).cloned(), |t| {
            t.created_at
        })
    }

    async fn is_live(&self, session_id: Uuid) -> bool {
        self.inner
            .state
            .lock()
            .await
            .live_sessions
            .contains_key(&session_id)
    }

    /// Validates the bearer token and returns the caller's user ID
    async fn authorize(&self, session: &Session) -> RemoteResult<Uuid> {
        let claims = validate_token(&session.access_token, &self.inner.jwt_secret)?;

        let state = self.inner.state.lock().await;
        match state.live_sessions.get(&claims.sid) {
            Some(owner) if *owner == claims.sub => Ok(claims.sub),
            _ => Err(RemoteError::Unauthorized(
                "Session is no longer valid".to_string(),
            )),
        }
    }

    /// Applies a pending fault for `op`, if any
    async fn inject(&self, op: Operation) -> RemoteResult<()> {
        let fault = self.inner.state.lock().await.take_fault(op);

        match fault {
            Some(Fault::Fail(_, message)) => {
                tracing::debug!(operation = ?op, "Injecting failure");
                Err(RemoteError::Injected(message))
            }
            Some(Fault::Hold(_, gate)) => {
                tracing::debug!(operation = ?op, "Holding operation");
                gate.notified().await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Authorizes and runs the fault injector
    async fn begin(&self, op: Operation, session: &Session) -> RemoteResult<Uuid> {
        let user_id = self.authorize(session).await?;
        self.inject(op).await?;
        Ok(user_id)
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, owner: Uuid) {
        // No subscribers is not an error
        let _ = self
            .inner
            .changes
            .send(ChangeEvent::new(collection, kind, owner));
        tracing::trace!(collection = %collection, kind = ?kind, owner = %owner, "Change published");
    }
}

fn newest_first<T, I, F>(items: I, created_at: F) -> Vec<T>
where
    I: Iterator<Item = T>,
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl DataService for MemoryServer {
    async fn list_inbox(&self, session: &Session) -> RemoteResult<Vec<InboxItem>> {
        let user_id = self.begin(Operation::ListInbox, session).await?;
        Ok(self.inbox_of(user_id).await)
    }

    async fn insert_inbox(
        &self,
        session: &Session,
        item: &NewInboxItem,
    ) -> RemoteResult<InboxItem> {
        let user_id = self.begin(Operation::InsertInbox, session).await?;
        item.validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid inbox item: {}", e)))?;

        let record = {
            let mut state = self.inner.state.lock().await;
            let record = InboxItem {
                id: Uuid::new_v4(),
                user_id,
                text: item.text.clone(),
                created_at: state.stamp(),
            };
            state.inbox.push(record.clone());
            record
        };

        self.publish(Collection::Inbox, ChangeKind::Insert, user_id);
        Ok(record)
    }

    async fn delete_inbox(&self, session: &Session, id: Uuid) -> RemoteResult<()> {
        let user_id = self.begin(Operation::DeleteInbox, session).await?;

        {
            let mut state = self.inner.state.lock().await;
            let pos = state
                .inbox
                .iter()
                .position(|i| i.id == id && i.user_id == user_id)
                .ok_or_else(|| RemoteError::NotFound(format!("Inbox item {}", id)))?;
            state.inbox.remove(pos);
        }

        self.publish(Collection::Inbox, ChangeKind::Delete, user_id);
        Ok(())
    }

    async fn list_tasks(&self, session: &Session) -> RemoteResult<Vec<Task>> {
        let user_id = self.begin(Operation::ListTasks, session).await?;
        Ok(self.tasks_of(user_id).await)
    }

    async fn insert_task(&self, session: &Session, task: &NewTask) -> RemoteResult<Task> {
        let user_id = self.begin(Operation::InsertTask, session).await?;
        task.validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid task: {}", e)))?;

        let record = {
            let mut state = self.inner.state.lock().await;
            let record = Task {
                id: Uuid::new_v4(),
                user_id,
                title: task.title.clone(),
                priority: task.priority,
                category: task.category,
                status: TaskStatus::Pending,
                created_at: state.stamp(),
                completed_at: None,
            };
            state.tasks.push(record.clone());
            record
        };

        self.publish(Collection::Tasks, ChangeKind::Insert, user_id);
        Ok(record)
    }

    async fn complete_task(&self, session: &Session, id: Uuid) -> RemoteResult<Task> {
        let user_id = self.begin(Operation::CompleteTask, session).await?;

        let record = {
            let mut state = self.inner.state.lock().await;
            let stamp = state.stamp();
            let task = state
                .tasks
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user_id)
                .ok_or_else(|| RemoteError::NotFound(format!("Task {}", id)))?;

            if !task.complete(stamp) {
                return Err(RemoteError::Conflict(format!(
                    "Task {} is already completed",
                    id
                )));
            }
            task.clone()
        };

        self.publish(Collection::Tasks, ChangeKind::Update, user_id);
        Ok(record)
    }

    async fn delete_task(&self, session: &Session, id: Uuid) -> RemoteResult<()> {
        let user_id = self.begin(Operation::DeleteTask, session).await?;

        {
            let mut state = self.inner.state.lock().await;
            let pos = state
                .tasks
                .iter()
                .position(|t| t.id == id && t.user_id == user_id)
                .ok_or_else(|| RemoteError::NotFound(format!("Task {}", id)))?;
            state.tasks.remove(pos);
        }

        self.publish(Collection::Tasks, ChangeKind::Delete, user_id);
        Ok(())
    }

    fn changes(&self, collection: Collection, owner: Uuid) -> ChangeStream {
        let stream = BroadcastStream::new(self.inner.changes.subscribe()).filter_map(
            move |message| match message {
                Ok(event) if event.collection == collection && event.owner == owner => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::warn!(collection = %collection, missed, "Change stream lagged");
                    Some(ChangeEvent::resync(collection, owner))
                }
            },
        );
        Box::pin(stream)
    }
}

/// Session held by one client
struct ClientSession {
    session: Session,
    session_id: Uuid,
}

struct ClientInner {
    session: Mutex<Option<ClientSession>>,
    auth_tx: broadcast::Sender<AuthEvent>,
}

/// One client's session service
pub struct MemoryClient {
    server: MemoryServer,
    inner: Arc<ClientInner>,
}

impl MemoryClient {
    /// The server this client talks to
    pub fn server(&self) -> &MemoryServer {
        &self.server
    }

    async fn check_password(&self, request: &SignInRequest) -> RemoteResult<(Uuid, String)> {
        let account = {
            let state = self.server.inner.state.lock().await;
            state
                .accounts
                .get(&request.email.to_lowercase())
                .map(|a| (a.user_id, a.email.clone(), a.password_hash.clone()))
        };

        let Some((user_id, email, password_hash)) = account else {
            return Err(RemoteError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let password = request.password.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| RemoteError::Transport(format!("Verification task failed: {}", e)))?
            .map_err(|e| RemoteError::Rejected(e.to_string()))?;

        if !verified {
            return Err(RemoteError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok((user_id, email))
    }
}

#[async_trait]
impl AuthService for MemoryClient {
    async fn get_session(&self) -> RemoteResult<Option<Session>> {
        let current = self.inner.session.lock().await;
        let Some(current) = current.as_ref() else {
            return Ok(None);
        };

        if current.session.is_expired() || !self.server.is_live(current.session_id).await {
            return Ok(None);
        }

        Ok(Some(current.session.clone()))
    }

    async fn sign_in_with_password(&self, request: &SignInRequest) -> RemoteResult<Session> {
        request
            .validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid sign-in request: {}", e)))?;
        self.server.inject(Operation::SignIn).await?;

        let (user_id, email) = self.check_password(request).await?;

        let session_id = Uuid::new_v4();
        let claims =
            Claims::with_expiration(user_id, &email, session_id, self.server.inner.token_lifetime);
        let access_token = create_token(&claims, &self.server.inner.jwt_secret)
            .map_err(|e| RemoteError::Rejected(e.to_string()))?;

        let session = Session {
            user: CurrentUser { user_id, email },
            access_token,
            expires_at: claims.expires_at(),
        };

        self.server
            .inner
            .state
            .lock()
            .await
            .live_sessions
            .insert(session_id, user_id);

        let previous = self.inner.session.lock().await.replace(ClientSession {
            session: session.clone(),
            session_id,
        });
        if let Some(previous) = previous {
            self.server
                .inner
                .state
                .lock()
                .await
                .live_sessions
                .remove(&previous.session_id);
        }

        let _ = self.inner.auth_tx.send(AuthEvent::SignedIn(session.clone()));
        tracing::info!(user_id = %user_id, "Signed in");

        Ok(session)
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        let previous = self.inner.session.lock().await.take();

        if let Some(previous) = previous {
            self.server
                .inner
                .state
                .lock()
                .await
                .live_sessions
                .remove(&previous.session_id);
            let _ = self.inner.auth_tx.send(AuthEvent::SignedOut);
            tracing::info!(user_id = %previous.session.user_id(), "Signed out");
        }

        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    async fn signed_in(server: &MemoryServer, email: &str) -> (MemoryClient, Session) {
        server.create_user(email, "password").await.unwrap();
        let client = server.connect().await;
        let session = client
            .sign_in_with_password(&SignInRequest::new(email, "password"))
            .await
            .unwrap();
        (client, session)
    }

    #[tokio::test]
    async fn test_sign_in_and_get_session() {
        let server = MemoryServer::new(SECRET);
        let (client, session) = signed_in(&server, "a@example.com").await;

        assert_eq!(session.user.email, "a@example.com");
        assert_eq!(client.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let server = MemoryServer::new(SECRET);
        server.create_user("a@example.com", "password").await.unwrap();
        let client = server.connect().await;

        let result = client
            .sign_in_with_password(&SignInRequest::new("a@example.com", "nope"))
            .await;
        assert!(matches!(result, Err(RemoteError::Unauthorized(_))));

        let result = client
            .sign_in_with_password(&SignInRequest::new("nobody@example.com", "password"))
            .await;
        assert!(matches!(result, Err(RemoteError::Unauthorized(_))));

        assert_eq!(client.get_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_account() {
        let server = MemoryServer::new(SECRET);
        server.create_user("a@example.com", "password").await.unwrap();

        let result = server.create_user("A@example.com", "other").await;
        assert!(matches!(result, Err(RemoteError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_token() {
        let server = MemoryServer::new(SECRET);
        let (client, session) = signed_in(&server, "a@example.com").await;

        client.sign_out().await.unwrap();

        assert_eq!(client.get_session().await.unwrap(), None);
        let result = server.list_inbox(&session).await;
        assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_expired_token_ends_session() {
        let server = MemoryServer::with_token_lifetime(SECRET, Duration::seconds(-1));
        let (client, session) = signed_in(&server, "a@example.com").await;

        assert!(session.is_expired());
        assert_eq!(client.get_session().await.unwrap(), None);
        let result = server.list_inbox(&session).await;
        assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_auth_events() {
        let server = MemoryServer::new(SECRET);
        server.create_user("a@example.com", "password").await.unwrap();
        let client = server.connect().await;
        let mut events = client.auth_events();

        client
            .sign_in_with_password(&SignInRequest::new("a@example.com", "password"))
            .await
            .unwrap();
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));

        client.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_revoke_sessions_signs_out_every_client() {
        let server = MemoryServer::new(SECRET);
        let (laptop, session) = signed_in(&server, "a@example.com").await;
        let phone = server.connect().await;
        phone
            .sign_in_with_password(&SignInRequest::new("a@example.com", "password"))
            .await
            .unwrap();
        let mut phone_events = phone.auth_events();

        server.revoke_sessions(session.user_id()).await;

        assert_eq!(laptop.get_session().await.unwrap(), None);
        assert_eq!(phone.get_session().await.unwrap(), None);
        assert_eq!(phone_events.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_inbox_crud_and_ordering() {
        let server = MemoryServer::new(SECRET);
        let (_client, session) = signed_in(&server, "a@example.com").await;

        let first = server
            .insert_inbox(&session, &NewInboxItem::new("first"))
            .await
            .unwrap();
        let second = server
            .insert_inbox(&session, &NewInboxItem::new("second"))
            .await
            .unwrap();
        assert!(second.created_at > first.created_at);

        let items = server.list_inbox(&session).await.unwrap();
        assert_eq!(items, vec![second.clone(), first.clone()]);

        server.delete_inbox(&session, first.id).await.unwrap();
        assert_eq!(server.list_inbox(&session).await.unwrap(), vec![second]);

        let again = server.delete_inbox(&session, first.id).await;
        assert!(matches!(again, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_inbox_item_rejected() {
        let server = MemoryServer::new(SECRET);
        let (_client, session) = signed_in(&server, "a@example.com").await;

        let result = server.insert_inbox(&session, &NewInboxItem::new("  ")).await;
        assert!(matches!(result, Err(RemoteError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_rows_are_owner_scoped() {
        let server = MemoryServer::new(SECRET);
        let (_a, alice) = signed_in(&server, "alice@example.com").await;
        let (_b, bob) = signed_in(&server, "bob@example.com").await;

        let item = server
            .insert_inbox(&alice, &NewInboxItem::new("alice's note"))
            .await
            .unwrap();

        assert!(server.list_inbox(&bob).await.unwrap().is_empty());
        let result = server.delete_inbox(&bob, item.id).await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
        assert_eq!(server.list_inbox(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_task_stamps_and_conflicts() {
        let server = MemoryServer::new(SECRET);
        let (_client, session) = signed_in(&server, "a@example.com").await;

        let task = server
            .insert_task(
                &session,
                &NewTask::new("Run", Priority::new(2).unwrap(), Category::Health),
            )
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let done = server.complete_task(&session, task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.unwrap() > task.created_at);
        assert!(done.is_consistent());

        let again = server.complete_task(&session, task.id).await;
        assert!(matches!(again, Err(RemoteError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_fail_next_targets_one_operation() {
        let server = MemoryServer::new(SECRET);
        let (_client, session) = signed_in(&server, "a@example.com").await;

        server.fail_next(Operation::InsertInbox, "boom").await;

        assert!(server.list_inbox(&session).await.is_ok());
        let result = server.insert_inbox(&session, &NewInboxItem::new("x")).await;
        assert_eq!(result, Err(RemoteError::Injected("boom".to_string())));
        assert!(server.insert_inbox(&session, &NewInboxItem::new("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_hold_next_waits_for_release() {
        let server = MemoryServer::new(SECRET);
        let (_client, session) = signed_in(&server, "a@example.com").await;

        let gate = server.hold_next(Operation::InsertInbox).await;
        let pending = {
            let server = server.clone();
            let session = session.clone();
            tokio::spawn(async move { server.insert_inbox(&session, &NewInboxItem::new("x")).await })
        };

        tokio::task::yield_now().await;
        assert!(server.inbox_of(session.user_id()).await.is_empty());

        gate.notify_one();
        assert!(pending.await.unwrap().is_ok());
        assert_eq!(server.inbox_of(session.user_id()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_change_stream_is_filtered() {
        let server = MemoryServer::new(SECRET);
        let (_a, alice) = signed_in(&server, "alice@example.com").await;
        let (_b, bob) = signed_in(&server, "bob@example.com").await;

        let mut stream = server.changes(Collection::Inbox, alice.user_id());

        server.insert_inbox(&bob, &NewInboxItem::new("bob")).await.unwrap();
        server
            .insert_task(&alice, &NewTask::new("t", Priority::default(), Category::Other))
            .await
            .unwrap();
        server.insert_inbox(&alice, &NewInboxItem::new("alice")).await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(
            event,
            ChangeEvent::new(Collection::Inbox, ChangeKind::Insert, alice.user_id())
        );
    }
}
