/// Integration tests for the in-process backend
///
/// Exercises the backend through the public service contracts only, the same
/// way the client crate uses it.
///
/// Run with: cargo test --test memory_backend_tests

use lifeos_shared::auth::SignInRequest;
use lifeos_shared::models::{Category, NewInboxItem, NewTask, Priority};
use lifeos_shared::remote::memory::MemoryServer;
use lifeos_shared::remote::{AuthService, ChangeKind, Collection, DataService, RemoteError};
use std::sync::Arc;
use tokio_stream::StreamExt;

const SECRET: &str = "integration-secret-key-at-least-32-bytes";

#[tokio::test]
async fn test_two_devices_share_rows_and_notifications() {
    let server = MemoryServer::new(SECRET);
    server.create_user("me@example.com", "password").await.unwrap();

    let laptop = server.connect().await;
    let phone = server.connect().await;
    let request = SignInRequest::new("me@example.com", "password");
    let laptop_session = laptop.sign_in_with_password(&request).await.unwrap();
    let phone_session = phone.sign_in_with_password(&request).await.unwrap();
    assert_eq!(laptop_session.user, phone_session.user);

    let data: Arc<dyn DataService> = Arc::new(server.clone());
    let mut laptop_changes = data.changes(Collection::Tasks, laptop_session.user_id());

    let task = data
        .insert_task(
            &phone_session,
            &NewTask::new("Call bank", Priority::new(5).unwrap(), Category::Finance),
        )
        .await
        .unwrap();

    let event = laptop_changes.next().await.unwrap();
    assert_eq!(event.kind, ChangeKind::Insert);

    let seen = data.list_tasks(&laptop_session).await.unwrap();
    assert_eq!(seen, vec![task]);
}

#[tokio::test]
async fn test_revoked_session_is_rejected_by_data_calls() {
    let server = MemoryServer::new(SECRET);
    let user_id = server.create_user("me@example.com", "password").await.unwrap();
    let client = server.connect().await;
    let session = client
        .sign_in_with_password(&SignInRequest::new("me@example.com", "password"))
        .await
        .unwrap();

    server
        .insert_inbox(&session, &NewInboxItem::new("keep me"))
        .await
        .unwrap();
    server.revoke_sessions(user_id).await;

    let result = server.list_inbox(&session).await;
    assert!(matches!(result, Err(RemoteError::Unauthorized(_))));

    // Rows survive the revocation
    assert_eq!(server.inbox_of(user_id).await.len(), 1);
}

#[tokio::test]
async fn test_token_from_another_server_is_rejected() {
    let ours = MemoryServer::new(SECRET);
    let theirs = MemoryServer::new("another-secret-key-at-least-32-bytes!!");
    theirs.create_user("me@example.com", "password").await.unwrap();

    let client = theirs.connect().await;
    let foreign = client
        .sign_in_with_password(&SignInRequest::new("me@example.com", "password"))
        .await
        .unwrap();

    let result = ours.list_tasks(&foreign).await;
    assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
}

#[tokio::test]
async fn test_email_lookup_is_case_insensitive() {
    let server = MemoryServer::new(SECRET);
    server.create_user("Me@Example.com", "password").await.unwrap();

    let client = server.connect().await;
    let session = client
        .sign_in_with_password(&SignInRequest::new("me@example.com", "password"))
        .await
        .unwrap();

    assert_eq!(session.user.email, "Me@Example.com");
}
