/// Application context
///
/// [`LifeOs`] wires the session manager to the task store: every session
/// change starts a new epoch, drops the previous store and, when someone is
/// signed in, opens a fresh store for them. Nothing cached for one user
/// survives into the next user's session.
///
/// # Session Changes
///
/// ```text
/// SessionStatus ──> Pending          : nothing
///               ──> SignedOut        : new epoch (empty), drop store
///               ──> SignedIn(user)   : new epoch for user, open store
/// ```
///
/// A repeated `SignedIn` for the same user rebuilds only when the access
/// token differs from the open store's, i.e. after a fresh sign-in.

use lifeos_shared::auth::CurrentUser;
use lifeos_shared::remote::{AuthService, DataService, RemoteResult};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::{SignInFailed, StoreError, StoreResult};
use crate::session::{SessionManager, SessionStatus};
use crate::store::{Snapshot, Snapshots, TaskStore};

type StoreSlot = Arc<RwLock<Option<Arc<TaskStore>>>>;

/// Application context
pub struct LifeOs {
    session: Arc<SessionManager>,
    snapshots: Snapshots,
    store: StoreSlot,
    shutdown: CancellationToken,
}

impl LifeOs {
    /// Starts the session manager and the store rebuild loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(auth: Arc<dyn AuthService>, data: Arc<dyn DataService>) -> Self {
        let session = Arc::new(SessionManager::start(auth));
        let snapshots = Snapshots::new();
        let store: StoreSlot = Arc::new(RwLock::new(None));
        let shutdown = CancellationToken::new();

        tokio::spawn(rebuild_loop(
            session.clone(),
            data,
            snapshots.clone(),
            store.clone(),
            shutdown.clone(),
        ));

        LifeOs {
            session,
            snapshots,
            store,
            shutdown,
        }
    }

    /// Session manager
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Current session status
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Signs in
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, SignInFailed> {
        self.session.sign_in(email, password).await
    }

    /// Signs out
    pub async fn sign_out(&self) -> RemoteResult<()> {
        self.session.sign_out().await
    }

    /// Subscribes to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.current()
    }

    /// Store for the current session, if one is open
    pub async fn store(&self) -> Option<Arc<TaskStore>> {
        self.store.read().await.clone()
    }

    /// Waits for the initial session lookup and, if signed in, for the store
    /// of the current session to finish loading
    ///
    /// A store opened for an earlier session of the same user is never
    /// returned; the wait continues until the store for the current access
    /// token is in place.
    ///
    /// # Errors
    ///
    /// Returns `SessionEnded` if no one is signed in or the session ends
    /// while waiting.
    pub async fn ready(&self) -> StoreResult<Arc<TaskStore>> {
        let mut status = self.session.subscribe();
        status
            .wait_for(|s| !s.is_pending())
            .await
            .map_err(|_| StoreError::SessionEnded)?;
        let mut snapshots = self.snapshots.subscribe();

        loop {
            let user = match status.borrow_and_update().clone() {
                SessionStatus::SignedIn(user) => user,
                _ => return Err(StoreError::SessionEnded),
            };
            let session = match self.session.session().await? {
                Some(session) if session.user_id() == user.user_id => session,
                _ => return Err(StoreError::SessionEnded),
            };

            let store = self.store.read().await.clone();
            if let Some(store) = store.filter(|s| s.session().access_token == session.access_token) {
                store.ready().await?;
                return Ok(store);
            }

            // The rebuild loop has not caught up with this session yet
            tokio::select! {
                changed = status.changed() => changed.map_err(|_| StoreError::SessionEnded)?,
                changed = snapshots.changed() => changed.map_err(|_| StoreError::SessionEnded)?,
            }
        }
    }
}

impl Drop for LifeOs {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Follows session changes until shutdown
async fn rebuild_loop(
    session: Arc<SessionManager>,
    data: Arc<dyn DataService>,
    snapshots: Snapshots,
    slot: StoreSlot,
    shutdown: CancellationToken,
) {
    let mut status = session.subscribe();

    loop {
        let current = status.borrow_and_update().clone();
        rebuild(&session, &data, &snapshots, &slot, current).await;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    // Close the last store with the app
    if let Some(store) = slot.write().await.take() {
        store.close();
    }
    tracing::debug!("Store rebuild loop stopped");
}

async fn rebuild(
    session: &SessionManager,
    data: &Arc<dyn DataService>,
    snapshots: &Snapshots,
    slot: &StoreSlot,
    status: SessionStatus,
) {
    match status {
        SessionStatus::Pending => {}
        SessionStatus::SignedOut => {
            let mut current = slot.write().await;
            if current.is_none() && snapshots.current().owner.is_none() {
                return;
            }
            snapshots.begin_epoch(None);
            if let Some(store) = current.take() {
                store.close();
            }
            tracing::info!("Signed out, store closed");
        }
        SessionStatus::SignedIn(user) => {
            let full = match session.session().await {
                Ok(Some(full)) if full.user_id() == user.user_id => full,
                Ok(_) => {
                    tracing::debug!(user_id = %user.user_id, "Session changed again, skipping rebuild");
                    return;
                }
                Err(e) => {
                    tracing::error!(user_id = %user.user_id, error = %e, "Failed to read session");
                    return;
                }
            };

            let mut current = slot.write().await;
            if let Some(store) = current.as_ref() {
                if store.session().access_token == full.access_token {
                    return;
                }
            }

            let epoch = snapshots.begin_epoch(Some(user.user_id));
            if let Some(previous) = current.take() {
                previous.close();
            }
            let store = TaskStore::open(data.clone(), full, snapshots, epoch);
            *current = Some(Arc::new(store));
            tracing::info!(user_id = %user.user_id, epoch, "Store opened");
        }
    }
}
