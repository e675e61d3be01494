//! # LifeOS
//!
//! Command-line client for LifeOS: capture notes into an inbox, turn them
//! into prioritized tasks and see the one thing to do next.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive shell on the in-process demo backend
//! cargo run -p lifeos-cli
//!
//! # One-shot commands
//! cargo run -p lifeos-cli -- capture call the plumber
//! cargo run -p lifeos-cli -- today
//!
//! # Hosted backend
//! LIFEOS_BACKEND=rest LIFEOS_URL=https://... LIFEOS_ANON_KEY=... \
//!     cargo run -p lifeos-cli -- --email me@example.com --password ... board
//! ```

use clap::Parser;
use lifeos_cli::backend::Services;
use lifeos_cli::cli::{Cli, Command};
use lifeos_cli::config::Config;
use lifeos_cli::runner::Runner;
use lifeos_cli::shell;
use lifeos_client::app::LifeOs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr, so command output stays clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifeos_cli=info,lifeos_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("LifeOS v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?.with_overrides(&cli)?;
    tracing::info!(backend = %config.backend, "Configuration loaded");

    let services = Services::build(&config).await?;
    let mut runner = Runner::new(LifeOs::start(services.auth, services.data));

    if let Some((email, password)) = config.credentials() {
        match runner.login(&email, &password).await {
            Ok(message) => tracing::info!("{}", message),
            Err(e) => tracing::warn!(error = %e, "Startup sign-in failed"),
        }
    }

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(&mut runner).await?,
        command => {
            let output = runner.execute(&command).await?;
            println!("{}", output.trim_end());
        }
    }

    Ok(())
}
