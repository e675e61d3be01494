/// Hosted HTTP backend
///
/// Talks to a PostgREST data API (`/rest/v1/{table}`) and a GoTrue session
/// API (`/auth/v1/...`) behind a single project URL, authenticating every
/// request with the project's anonymous key plus the user's bearer token.
///
/// # Change Notifications
///
/// The HTTP API has no push channel, so [`RestClient::changes`] merges two
/// sources:
///
/// - mutations made through this client, echoed locally
/// - an optional polling tick, reported as [`ChangeKind::Resync`]
///
/// # Example
///
/// ```no_run
/// use lifeos_shared::auth::SignInRequest;
/// use lifeos_shared::remote::rest::{RestClient, RestConfig};
/// use lifeos_shared::remote::{AuthService, DataService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RestClient::new(RestConfig::new("https://project.example.co", "anon-key"))?;
/// let session = client
///     .sign_in_with_password(&SignInRequest::new("me@example.com", "password"))
///     .await?;
/// let tasks = client.list_tasks(&session).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;
use uuid::Uuid;
use validator::Validate;

use super::{
    AuthEvent, AuthService, ChangeEvent, ChangeKind, ChangeStream, Collection, DataService,
    RemoteError, RemoteResult,
};
use crate::auth::{CurrentUser, Session, SignInRequest};
use crate::models::{Category, InboxItem, NewInboxItem, NewTask, Priority, Task, TaskStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CHANNEL_CAPACITY: usize = 64;

/// HTTP backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    /// Project URL, e.g. `https://project.example.co`
    pub url: String,

    /// Public anonymous API key
    pub anon_key: String,

    /// Polling period for change notifications (`None` disables polling)
    pub poll_interval: Option<Duration>,
}

impl RestConfig {
    /// Creates a configuration with polling disabled
    pub fn new(url: &str, anon_key: &str) -> Self {
        RestConfig {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            poll_interval: None,
        }
    }

    /// Enables polling
    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = Some(period);
        self
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: Uuid,
    email: String,
}

impl TokenResponse {
    /// Builds the local session, with `expires_in` counted from `now`
    fn into_session(self, now: DateTime<Utc>) -> RemoteResult<Session> {
        let expires_at = ChronoDuration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                RemoteError::Decode(format!("Token lifetime out of range: {}s", self.expires_in))
            })?;

        Ok(Session {
            user: CurrentUser {
                user_id: self.user.id,
                email: self.user.email,
            },
            access_token: self.access_token,
            expires_at,
        })
    }
}

/// Error body returned by either API
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

#[derive(Serialize)]
struct InboxRow<'a> {
    user_id: Uuid,
    text: &'a str,
}

#[derive(Serialize)]
struct TaskRow<'a> {
    user_id: Uuid,
    title: &'a str,
    priority: Priority,
    category: Category,
    status: TaskStatus,
}

#[derive(Serialize)]
struct CompletionPatch {
    status: TaskStatus,
    completed_at: DateTime<Utc>,
}

/// PostgREST/GoTrue client
pub struct RestClient {
    http: Client,
    config: RestConfig,
    session: Mutex<Option<Session>>,
    auth_tx: broadcast::Sender<AuthEvent>,
    local_changes: broadcast::Sender<ChangeEvent>,
}

impl RestClient {
    /// Creates a client
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn new(config: RestConfig) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let (auth_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (local_changes, _) = broadcast::channel(CHANNEL_CAPACITY);

        Ok(RestClient {
            http,
            config,
            session: Mutex::new(None),
            auth_tx,
            local_changes,
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.config.url, collection.table())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    /// Request carrying the project key and the user's bearer token
    fn authed(&self, method: Method, url: String, session: &Session) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
    }

    fn echo(&self, collection: Collection, kind: ChangeKind, owner: Uuid) {
        let _ = self
            .local_changes
            .send(ChangeEvent::new(collection, kind, owner));
    }

    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<Vec<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Decode(format!("{} - {}", e, body)))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
        session: &Session,
    ) -> RemoteResult<Vec<T>> {
        let request = self
            .authed(Method::GET, self.table_url(collection), session)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.user_id())),
                ("order", "created_at.desc".to_string()),
            ]);

        self.rows(request).await
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        collection: Collection,
        session: &Session,
        body: &B,
    ) -> RemoteResult<T> {
        let request = self
            .authed(Method::POST, self.table_url(collection), session)
            .header("Prefer", "return=representation")
            .json(body);

        let record = self
            .rows::<T>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("Insert returned no rows".to_string()))?;

        self.echo(collection, ChangeKind::Insert, session.user_id());
        Ok(record)
    }

    async fn delete(&self, collection: Collection, session: &Session, id: Uuid) -> RemoteResult<()> {
        let request = self
            .authed(Method::DELETE, self.table_url(collection), session)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", session.user_id())),
            ]);

        let deleted: Vec<serde_json::Value> = self.rows(request).await?;
        if deleted.is_empty() {
            return Err(RemoteError::NotFound(format!("{} row {}", collection, id)));
        }

        self.echo(collection, ChangeKind::Delete, session.user_id());
        Ok(())
    }

    async fn find_task(&self, session: &Session, id: Uuid) -> RemoteResult<Option<Task>> {
        let request = self
            .authed(Method::GET, self.table_url(Collection::Tasks), session)
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", session.user_id())),
            ]);

        Ok(self.rows::<Task>(request).await?.into_iter().next())
    }
}

/// Maps a non-success HTTP status to a remote error
fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("{} {}", status, body));

    match status {
        StatusCode::BAD_REQUEST if message.contains("Invalid login credentials") => {
            RemoteError::Unauthorized(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::CONFLICT => RemoteError::Conflict(message),
        _ => RemoteError::Rejected(message),
    }
}

#[async_trait]
impl DataService for RestClient {
    async fn list_inbox(&self, session: &Session) -> RemoteResult<Vec<InboxItem>> {
        self.list(Collection::Inbox, session).await
    }

    async fn insert_inbox(
        &self,
        session: &Session,
        item: &NewInboxItem,
    ) -> RemoteResult<InboxItem> {
        item.validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid inbox item: {}", e)))?;

        let row = InboxRow {
            user_id: session.user_id(),
            text: &item.text,
        };
        self.insert(Collection::Inbox, session, &row).await
    }

    async fn delete_inbox(&self, session: &Session, id: Uuid) -> RemoteResult<()> {
        self.delete(Collection::Inbox, session, id).await
    }

    async fn list_tasks(&self, session: &Session) -> RemoteResult<Vec<Task>> {
        self.list(Collection::Tasks, session).await
    }

    async fn insert_task(&self, session: &Session, task: &NewTask) -> RemoteResult<Task> {
        task.validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid task: {}", e)))?;

        let row = TaskRow {
            user_id: session.user_id(),
            title: &task.title,
            priority: task.priority,
            category: task.category,
            status: TaskStatus::Pending,
        };
        self.insert(Collection::Tasks, session, &row).await
    }

    async fn complete_task(&self, session: &Session, id: Uuid) -> RemoteResult<Task> {
        let request = self
            .authed(Method::PATCH, self.table_url(Collection::Tasks), session)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", session.user_id())),
                ("status", "eq.pending".to_string()),
            ])
            .json(&CompletionPatch {
                status: TaskStatus::Completed,
                completed_at: Utc::now(),
            });

        match self.rows::<Task>(request).await?.into_iter().next() {
            Some(task) => {
                self.echo(Collection::Tasks, ChangeKind::Update, session.user_id());
                Ok(task)
            }
            // Nothing pending matched: either gone or already completed
            None => match self.find_task(session, id).await? {
                Some(_) => Err(RemoteError::Conflict(format!(
                    "Task {} is already completed",
                    id
                ))),
                None => Err(RemoteError::NotFound(format!("Task {}", id))),
            },
        }
    }

    async fn delete_task(&self, session: &Session, id: Uuid) -> RemoteResult<()> {
        self.delete(Collection::Tasks, session, id).await
    }

    fn changes(&self, collection: Collection, owner: Uuid) -> ChangeStream {
        let local = BroadcastStream::new(self.local_changes.subscribe()).filter_map(move |message| {
            match message {
                Ok(event) if event.collection == collection && event.owner == owner => Some(event),
                Ok(_) => None,
                Err(_) => Some(ChangeEvent::resync(collection, owner)),
            }
        });

        match self.config.poll_interval {
            Some(period) => {
                let start = tokio::time::Instant::now() + period;
                let ticks = IntervalStream::new(tokio::time::interval_at(start, period))
                    .map(move |_| ChangeEvent::resync(collection, owner));
                Box::pin(local.merge(ticks))
            }
            None => Box::pin(local),
        }
    }
}

#[async_trait]
impl AuthService for RestClient {
    async fn get_session(&self) -> RemoteResult<Option<Session>> {
        let current = self.session.lock().await;
        Ok(current.as_ref().filter(|s| !s.is_expired()).cloned())
    }

    async fn sign_in_with_password(&self, request: &SignInRequest) -> RemoteResult<Session> {
        request
            .validate()
            .map_err(|e| RemoteError::Rejected(format!("Invalid sign-in request: {}", e)))?;

        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .json(&serde_json::json!({
                "email": request.email,
                "password": request.password,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Decode(format!("Invalid token response: {}", e)))?;

        let session = token.into_session(Utc::now())?;

        *self.session.lock().await = Some(session.clone());
        let _ = self.auth_tx.send(AuthEvent::SignedIn(session.clone()));
        tracing::info!(user_id = %session.user_id(), "Signed in");

        Ok(session)
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        let previous = self.session.lock().await.take();
        let Some(previous) = previous else {
            return Ok(());
        };

        let result = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&previous.access_token)
            .send()
            .await;

        // The local session is gone either way
        match result {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    let error = status_error(status, &body);
                    tracing::warn!(status = %status, error = %error, "Logout rejected");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Logout request failed"),
        }

        let _ = self.auth_tx.send(AuthEvent::SignedOut);
        tracing::info!(user_id = %previous.user_id(), "Signed out");
        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }
}
