/// Integration tests for the application context
///
/// Drives `LifeOs` against the in-process backend: session changes, store
/// rebuilds, notification-driven sync between devices and late responses.
///
/// Run with: cargo test --test app_tests

use lifeos_client::app::LifeOs;
use lifeos_client::routes::{guard, Guard, Route};
use lifeos_client::session::SessionStatus;
use lifeos_client::store::Snapshot;
use lifeos_client::views::{ConversionForm, InboxView, TodayFocus};
use lifeos_client::{SignInFailed, StoreError};
use lifeos_shared::models::{Category, NewInboxItem, Priority};
use lifeos_shared::remote::memory::{MemoryServer, Operation};
use lifeos_shared::remote::DataService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const SECRET: &str = "integration-secret-key-at-least-32-bytes";
const WAIT: Duration = Duration::from_secs(5);

async fn app_for(server: &MemoryServer) -> LifeOs {
    LifeOs::start(Arc::new(server.connect().await), Arc::new(server.clone()))
}

async fn wait_for_snapshot(
    rx: &mut watch::Receiver<Snapshot>,
    predicate: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot channel closed")
        .clone()
}

#[tokio::test]
async fn test_sign_in_loads_existing_rows() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    app.sign_in("me@example.com", "password").await.unwrap();
    let store = timeout(WAIT, app.ready()).await.unwrap().unwrap();
    store.add_inbox_item("seed").await.unwrap();

    // A second device sees the row after its own initial load
    let other = app_for(&server).await;
    other.sign_in("me@example.com", "password").await.unwrap();
    timeout(WAIT, other.ready()).await.unwrap().unwrap();

    let view = InboxView::from_snapshot(&other.snapshot());
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].text, "seed");
}

#[tokio::test]
async fn test_ready_when_signed_out() {
    let server = MemoryServer::new(SECRET);
    let app = app_for(&server).await;

    let result = timeout(WAIT, app.ready()).await.unwrap();
    assert!(matches!(result, Err(StoreError::SessionEnded)));
    assert_eq!(guard(&app.status(), Route::Today), Guard::Redirect(Route::Login));
}

#[tokio::test]
async fn test_failed_sign_in_leaves_signed_out() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();
    let app = app_for(&server).await;

    assert_eq!(app.sign_in("me@example.com", "nope").await, Err(SignInFailed));
    let mut status = app.session().subscribe();
    let settled = status.wait_for(|s| !s.is_pending()).await.unwrap().clone();
    assert_eq!(settled, SessionStatus::SignedOut);
    assert!(app.store().await.is_none());
}

#[tokio::test]
async fn test_switching_users_never_shows_previous_rows() {
    let server = MemoryServer::new(SECRET);
    let alice = server.create_user("alice@example.com", "password").await.unwrap();
    let bob = server.create_user("bob@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    let mut rx = app.subscribe();

    app.sign_in("alice@example.com", "password").await.unwrap();
    let store = timeout(WAIT, app.ready()).await.unwrap().unwrap();
    store.add_inbox_item("alice's secret").await.unwrap();
    store
        .add_task("alice's task", Priority::new(5).unwrap(), Category::Work)
        .await
        .unwrap();

    app.sign_out().await.unwrap();
    let cleared = wait_for_snapshot(&mut rx, |s| s.owner.is_none() && s.epoch > 1).await;
    assert!(cleared.inbox.items.is_empty());
    assert!(cleared.tasks.items.is_empty());

    app.sign_in("bob@example.com", "password").await.unwrap();
    timeout(WAIT, app.ready()).await.unwrap().unwrap();

    let snapshot = app.snapshot();
    assert_eq!(snapshot.owner, Some(bob));
    assert!(snapshot.inbox.items.iter().all(|i| i.user_id != alice));
    assert!(snapshot.tasks.items.is_empty());

    // The old store cannot write into bob's snapshot
    let result = store.add_inbox_item("late").await;
    assert!(matches!(result, Err(StoreError::SessionEnded)));
}

#[tokio::test]
async fn test_response_after_sign_out_is_discarded() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    let mut rx = app.subscribe();
    app.sign_in("me@example.com", "password").await.unwrap();
    let store = timeout(WAIT, app.ready()).await.unwrap().unwrap();

    let gate = server.hold_next(Operation::InsertInbox).await;
    let in_flight = {
        let store = store.clone();
        tokio::spawn(async move { store.add_inbox_item("slow").await })
    };
    tokio::task::yield_now().await;

    app.sign_out().await.unwrap();
    wait_for_snapshot(&mut rx, |s| s.owner.is_none()).await;

    gate.notify_one();
    // The insert was authorized before sign-out, so the service accepts it
    assert!(in_flight.await.unwrap().is_ok());

    let snapshot = app.snapshot();
    assert_eq!(snapshot.owner, None);
    assert!(snapshot.inbox.items.is_empty());
}

#[tokio::test]
async fn test_change_from_another_device_is_synced() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let laptop = app_for(&server).await;
    laptop.sign_in("me@example.com", "password").await.unwrap();
    timeout(WAIT, laptop.ready()).await.unwrap().unwrap();
    let mut laptop_rx = laptop.subscribe();

    let phone = app_for(&server).await;
    phone.sign_in("me@example.com", "password").await.unwrap();
    let phone_store = timeout(WAIT, phone.ready()).await.unwrap().unwrap();

    let task = phone_store
        .add_task("Pay rent", Priority::new(5).unwrap(), Category::Finance)
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&mut laptop_rx, |s| s.tasks.get(task.id).is_some()).await;
    let today = TodayFocus::from_snapshot(&snapshot);
    assert_eq!(today.next.map(|t| t.id), Some(task.id));

    phone_store.complete_task(task.id).await.unwrap();
    let snapshot = wait_for_snapshot(&mut laptop_rx, |s| {
        s.tasks.get(task.id).map_or(false, |t| !t.is_pending())
    })
    .await;
    assert_eq!(TodayFocus::from_snapshot(&snapshot).completed_today, 1);
}

#[tokio::test]
async fn test_direct_service_write_is_synced() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    app.sign_in("me@example.com", "password").await.unwrap();
    let store = timeout(WAIT, app.ready()).await.unwrap().unwrap();
    let mut rx = app.subscribe();

    server
        .insert_inbox(store.session(), &NewInboxItem::new("via API"))
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&mut rx, |s| !s.inbox.items.is_empty()).await;
    assert_eq!(snapshot.inbox.items[0].text, "via API");
}

#[tokio::test]
async fn test_remote_revocation_tears_down_store() {
    let server = MemoryServer::new(SECRET);
    let user_id = server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    app.sign_in("me@example.com", "password").await.unwrap();
    timeout(WAIT, app.ready()).await.unwrap().unwrap();
    let mut rx = app.subscribe();

    server.revoke_sessions(user_id).await;

    wait_for_snapshot(&mut rx, |s| s.owner.is_none()).await;
    assert_eq!(app.status(), SessionStatus::SignedOut);
    assert!(app.store().await.is_none());
}

#[tokio::test]
async fn test_signing_in_again_replaces_store() {
    let server = MemoryServer::new(SECRET);
    let user_id = server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    app.sign_in("me@example.com", "password").await.unwrap();
    let first = timeout(WAIT, app.ready()).await.unwrap().unwrap();
    first.add_inbox_item("before").await.unwrap();

    app.sign_in("me@example.com", "password").await.unwrap();
    let second = timeout(WAIT, app.ready()).await.unwrap().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.epoch() > first.epoch());
    assert_ne!(second.session().access_token, first.session().access_token);

    second.add_inbox_item("after").await.unwrap();
    let texts: Vec<_> = server
        .inbox_of(user_id)
        .await
        .into_iter()
        .map(|i| i.text)
        .collect();
    assert_eq!(texts, vec!["after", "before"]);

    let result = first.add_inbox_item("stale").await;
    assert!(matches!(result, Err(StoreError::SessionEnded)));
}

#[tokio::test]
async fn test_token_expiry_tears_down_store() {
    let server = MemoryServer::with_token_lifetime(SECRET, chrono::Duration::seconds(1));
    server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    let mut rx = app.subscribe();
    app.sign_in("me@example.com", "password").await.unwrap();
    wait_for_snapshot(&mut rx, |s| s.owner.is_some()).await;

    wait_for_snapshot(&mut rx, |s| s.owner.is_none()).await;
    assert_eq!(app.status(), SessionStatus::SignedOut);
    assert!(app.store().await.is_none());
    assert_eq!(guard(&app.status(), Route::Today), Guard::Redirect(Route::Login));
}

#[tokio::test]
async fn test_conversion_form_flow() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let app = app_for(&server).await;
    app.sign_in("me@example.com", "password").await.unwrap();
    let store = timeout(WAIT, app.ready()).await.unwrap().unwrap();
    let item = store.add_inbox_item("Learn Rust").await.unwrap();

    let mut form = ConversionForm::new();
    form.toggle(item.id);
    form.priority = Priority::new(4).unwrap();
    form.category = Category::Learning;

    // A failed conversion keeps the form as it was
    server.fail_next(Operation::InsertTask, "unavailable").await;
    assert!(form.submit(&store).await.is_err());
    assert!(form.is_expanded(item.id));

    let task = form.submit(&store).await.unwrap();
    assert_eq!(task.category, Category::Learning);
    assert_eq!(task.priority.get(), 4);
    assert_eq!(form, ConversionForm::new());

    let snapshot = app.snapshot();
    assert!(snapshot.inbox.get(item.id).is_none());
    assert!(server
        .list_tasks(store.session())
        .await
        .unwrap()
        .iter()
        .any(|t| t.id == task.id));
}
