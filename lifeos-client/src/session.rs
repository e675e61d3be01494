/// Session manager
///
/// Tracks who is signed in, as reported by the session service, and exposes
/// it as a [`watch`] stream of [`SessionStatus`].
///
/// # Lifecycle
///
/// ```text
/// Pending ──(initial lookup)──> SignedOut <──> SignedIn(user)
/// ```
///
/// The status stays `Pending` until the first session lookup completes;
/// consumers such as the route guard must not make decisions before then.
/// After that the background listener follows the service's auth events, so a
/// sign-out performed elsewhere (another device, token revocation) is
/// reflected here without any call on this manager. The listener also re-reads
/// the session once its access token expires, which turns into `SignedOut`.
///
/// Every new session is announced, even one for the user who is already signed
/// in: subscribers compare access tokens to tell a fresh session from a
/// repeated status.
///
/// # Example
///
/// ```no_run
/// use lifeos_client::session::{SessionManager, SessionStatus};
/// use lifeos_shared::remote::memory::MemoryServer;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = MemoryServer::new("demo-secret-key-at-least-32-bytes-long");
/// let manager = SessionManager::start(Arc::new(server.connect().await));
///
/// let user = manager.sign_in("me@example.com", "password").await?;
/// assert_eq!(manager.status(), SessionStatus::SignedIn(user));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use lifeos_shared::auth::{CurrentUser, Session, SignInRequest};
use lifeos_shared::remote::{AuthEvent, AuthService, RemoteResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::SignInFailed;

/// Slack after a token's expiry before the session is re-read
const EXPIRY_GRACE: Duration = Duration::from_millis(50);

/// Current authentication state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Initial session lookup has not completed
    #[default]
    Pending,

    /// No one is signed in
    SignedOut,

    /// A user is signed in
    SignedIn(CurrentUser),
}

impl SessionStatus {
    /// Signed-in user, if any
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionStatus::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    /// Checks if the initial lookup is still running
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionStatus::Pending)
    }

    fn from_session(session: Option<&Session>) -> Self {
        match session {
            Some(session) => SessionStatus::SignedIn(session.user.clone()),
            None => SessionStatus::SignedOut,
        }
    }
}

/// Session manager
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
    status: Arc<watch::Sender<SessionStatus>>,
    shutdown: CancellationToken,
}

impl SessionManager {
    /// Creates a manager and starts following the session service
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(auth: Arc<dyn AuthService>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Pending);
        let status = Arc::new(status);
        let shutdown = CancellationToken::new();

        tokio::spawn(listen_loop(auth.clone(), status.clone(), shutdown.clone()));

        SessionManager {
            auth,
            status,
            shutdown,
        }
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Signed-in user, if any
    pub fn current_session(&self) -> Option<CurrentUser> {
        self.status.borrow().user().cloned()
    }

    /// Subscribes to status changes
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Full session (including the bearer token) from the session service
    pub async fn session(&self) -> RemoteResult<Option<Session>> {
        self.auth.get_session().await
    }

    /// Signs in with email and password
    ///
    /// # Errors
    ///
    /// Returns [`SignInFailed`] for any failure. The cause is logged, never
    /// returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, SignInFailed> {
        let request = SignInRequest::new(email, password);

        match self.auth.sign_in_with_password(&request).await {
            Ok(session) => {
                let user = session.user.clone();
                publish(&self.status, SessionStatus::SignedIn(user.clone()), true);
                tracing::info!(user_id = %user.user_id, "Sign-in succeeded");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                Err(SignInFailed)
            }
        }
    }

    /// Signs out
    ///
    /// The local status becomes `SignedOut` even if the service call fails.
    pub async fn sign_out(&self) -> RemoteResult<()> {
        let result = self.auth.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Sign-out request failed");
        }

        publish(&self.status, SessionStatus::SignedOut, false);
        result
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Replaces the status, notifying on a change or when `renewed` marks a new
/// session
fn publish(status: &watch::Sender<SessionStatus>, next: SessionStatus, renewed: bool) {
    status.send_if_modified(|current| {
        if *current == next && !renewed {
            return false;
        }
        *current = next;
        true
    });
}

async fn lookup(auth: &Arc<dyn AuthService>) -> Option<Session> {
    match auth.get_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed, treating as signed out");
            None
        }
    }
}

/// Re-reads the session and publishes it, returning its expiry
async fn refresh(
    auth: &Arc<dyn AuthService>,
    status: &watch::Sender<SessionStatus>,
    renewed: bool,
) -> Option<DateTime<Utc>> {
    let session = lookup(auth).await;
    let renewed = renewed && session.is_some();
    publish(status, SessionStatus::from_session(session.as_ref()), renewed);
    session.map(|s| s.expires_at)
}

/// Completes shortly after `deadline`, never if there is none
async fn expiry(deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(at) => {
            let remaining = (at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(remaining + EXPIRY_GRACE).await;
        }
        None => std::future::pending().await,
    }
}

/// Follows the session service until shutdown
async fn listen_loop(
    auth: Arc<dyn AuthService>,
    status: Arc<watch::Sender<SessionStatus>>,
    shutdown: CancellationToken,
) {
    // Subscribe before the lookup so no event falls in between
    let mut events = auth.auth_events();

    let initial = lookup(&auth).await;
    let mut expires_at = initial.as_ref().map(|s| s.expires_at);
    let initial = SessionStatus::from_session(initial.as_ref());
    tracing::debug!(status = ?initial, "Initial session lookup complete");
    // Someone may have signed in while the lookup was in flight
    status.send_if_modified(|current| {
        if current.is_pending() {
            *current = initial;
            true
        } else {
            false
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Session listener stopped");
                break;
            }
            _ = expiry(expires_at) => {
                tracing::info!("Access token expired, re-reading session");
                expires_at = refresh(&auth, &status, false).await;
            }
            event = events.recv() => {
                // Events may be stale by the time they are read; the service's
                // current session is authoritative
                match event {
                    Ok(AuthEvent::SignedIn(session)) => {
                        tracing::debug!(user_id = %session.user_id(), "Auth event: signed in");
                        expires_at = refresh(&auth, &status, true).await;
                    }
                    Ok(AuthEvent::SignedOut) => {
                        tracing::debug!("Auth event: signed out");
                        expires_at = refresh(&auth, &status, false).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Auth events lagged, re-reading session");
                        expires_at = refresh(&auth, &status, true).await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Auth event stream closed");
                        break;
                    }
                }
            }
        }
    }
}
