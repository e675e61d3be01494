//! # LifeOS Client Library
//!
//! Client-side state for LifeOS: who is signed in, a session-scoped cache of
//! the user's inbox and tasks kept in sync with the remote service, and the
//! read-only view-models the front end renders.
//!
//! ## Modules
//!
//! - `session`: Session manager (sign-in, sign-out, status stream)
//! - `store`: Task store (sync, mutations, ranking, snapshots)
//! - `app`: Application context that rebuilds the store on session changes
//! - `views`: View-models for the four screens
//! - `routes`: Route table and access guard
//! - `error`: Store and sign-in error types
//!
//! ## Example
//!
//! ```no_run
//! use lifeos_client::app::LifeOs;
//! use lifeos_shared::remote::memory::MemoryServer;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MemoryServer::new("demo-secret-key-at-least-32-bytes-long");
//! server.create_user("me@example.com", "password").await?;
//!
//! let app = LifeOs::start(Arc::new(server.connect().await), Arc::new(server.clone()));
//! app.sign_in("me@example.com", "password").await?;
//!
//! let store = app.ready().await?;
//! store.add_inbox_item("Call the dentist").await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod error;
pub mod routes;
pub mod session;
pub mod store;
pub mod views;

pub use error::{SignInFailed, StoreError, StoreResult};
