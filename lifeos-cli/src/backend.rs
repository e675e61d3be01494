/// Service construction
///
/// Builds the auth and data services for the configured backend. The
/// in-process backend starts with a demo account that already has a few
/// notes and tasks, so a fresh run has something to look at.

use anyhow::Context;
use lifeos_shared::auth::SignInRequest;
use lifeos_shared::models::{Category, NewInboxItem, NewTask, Priority};
use lifeos_shared::remote::memory::MemoryServer;
use lifeos_shared::remote::rest::{RestClient, RestConfig};
use lifeos_shared::remote::{AuthService, DataService, RemoteResult};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Backend, Config, DemoAccount, RestSettings};

const DEMO_NOTES: &[&str] = &[
    "Look into a standing desk",
    "Call the dentist about the cleaning",
    "Idea: weekly review every Friday",
];

const DEMO_TASKS: &[(&str, u8, Category)] = &[
    ("Finish the quarterly report", 5, Category::Work),
    ("Renew car insurance", 4, Category::Finance),
    ("Read a chapter of the Rust book", 3, Category::Learning),
    ("Go for a run", 2, Category::Health),
];

/// Auth and data services for one backend
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub data: Arc<dyn DataService>,
}

impl Services {
    /// Builds the services the configuration selects
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        match config.backend {
            Backend::Memory => Self::memory(&config.jwt_secret, &config.demo).await,
            Backend::Rest => {
                let settings = config
                    .rest
                    .as_ref()
                    .context("LIFEOS_URL and LIFEOS_ANON_KEY are required for the rest backend")?;
                Self::rest(settings)
            }
        }
    }

    /// Starts an in-process backend with the demo account seeded
    pub async fn memory(jwt_secret: &str, demo: &DemoAccount) -> anyhow::Result<Self> {
        let server = MemoryServer::new(jwt_secret);
        let user_id = seed_demo(&server, demo)
            .await
            .context("Failed to seed the demo account")?;
        tracing::info!(user_id = %user_id, email = %demo.email, "In-process backend ready");

        Ok(Services {
            auth: Arc::new(server.connect().await),
            data: Arc::new(server),
        })
    }

    /// Connects to a hosted backend
    pub fn rest(settings: &RestSettings) -> anyhow::Result<Self> {
        let mut config = RestConfig::new(&settings.url, &settings.anon_key);
        if let Some(period) = settings.poll_interval {
            config = config.with_poll_interval(period);
        }

        let client = Arc::new(RestClient::new(config).context("Failed to build HTTP client")?);
        tracing::info!(url = %settings.url, "Hosted backend configured");

        Ok(Services {
            auth: client.clone(),
            data: client,
        })
    }
}

/// Creates the demo account and fills it with sample rows
///
/// Uses a throwaway client so that the caller's own client starts signed out.
pub async fn seed_demo(server: &MemoryServer, demo: &DemoAccount) -> RemoteResult<Uuid> {
    let user_id = server.create_user(&demo.email, &demo.password).await?;

    let client = server.connect().await;
    let session = client
        .sign_in_with_password(&SignInRequest::new(&demo.email, &demo.password))
        .await?;

    for note in DEMO_NOTES {
        server.insert_inbox(&session, &NewInboxItem::new(note)).await?;
    }

    for (title, priority, category) in DEMO_TASKS {
        let priority = Priority::new(*priority).unwrap_or_default();
        server
            .insert_task(&session, &NewTask::new(title, priority, *category))
            .await?;
    }

    client.sign_out().await?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> DemoAccount {
        DemoAccount {
            email: "demo@example.com".to_string(),
            password: "demo-password".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seed_demo() {
        let server = MemoryServer::new("seed-test-secret-at-least-32-bytes-long");
        let user_id = seed_demo(&server, &demo()).await.unwrap();

        assert_eq!(server.inbox_of(user_id).await.len(), DEMO_NOTES.len());
        let tasks = server.tasks_of(user_id).await;
        assert_eq!(tasks.len(), DEMO_TASKS.len());
        assert!(tasks.iter().all(|t| t.is_pending()));
    }

    #[tokio::test]
    async fn test_memory_services_start_signed_out() {
        let services = Services::memory("seed-test-secret-at-least-32-bytes-long", &demo())
            .await
            .unwrap();

        assert!(services.auth.get_session().await.unwrap().is_none());
        let session = services
            .auth
            .sign_in_with_password(&SignInRequest::new("demo@example.com", "demo-password"))
            .await
            .unwrap();
        assert_eq!(services.data.list_tasks(&session).await.unwrap().len(), DEMO_TASKS.len());
    }

    #[test]
    fn test_rest_services() {
        let settings = RestSettings {
            url: "https://project.example.co/".to_string(),
            anon_key: "anon".to_string(),
            poll_interval: None,
        };
        assert!(Services::rest(&settings).is_ok());
    }
}
