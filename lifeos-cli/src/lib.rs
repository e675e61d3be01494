//! # LifeOS Command-Line Client
//!
//! Terminal front end for the LifeOS client library: capture notes, turn them
//! into prioritized tasks and see what to work on next.
//!
//! ## Modules
//!
//! - `config`: Environment and flag configuration
//! - `cli`: Argument and shell-line parsing
//! - `backend`: Builds the auth and data services for the selected backend
//! - `runner`: Executes commands against the application context
//! - `render`: Plain-text rendering of the screens
//! - `refs`: Resolves `<ref>` arguments to record ids
//! - `shell`: Interactive read-eval loop
//!
//! ## Example
//!
//! ```no_run
//! use lifeos_cli::backend::Services;
//! use lifeos_cli::cli::Command;
//! use lifeos_cli::config::Config;
//! use lifeos_cli::runner::Runner;
//! use lifeos_client::app::LifeOs;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let services = Services::build(&config).await?;
//! let mut runner = Runner::new(LifeOs::start(services.auth, services.data));
//! runner.login("demo@lifeos.local", "demo-password").await?;
//! println!("{}", runner.execute(&Command::Today).await?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod refs;
pub mod render;
pub mod runner;
pub mod shell;

pub use error::{CliError, CliResult};
