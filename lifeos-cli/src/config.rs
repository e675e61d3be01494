/// Configuration management for the command-line client
///
/// Loads configuration from environment variables (and a `.env` file when
/// present). Command-line flags override what the environment says.
///
/// # Environment Variables
///
/// - `LIFEOS_BACKEND`: `memory` (default) or `rest`
/// - `LIFEOS_URL`: Project URL (required for `rest`)
/// - `LIFEOS_ANON_KEY`: Public API key (required for `rest`)
/// - `LIFEOS_EMAIL` / `LIFEOS_PASSWORD`: Credentials to sign in with
/// - `LIFEOS_DEMO_EMAIL` / `LIFEOS_DEMO_PASSWORD`: Account seeded into the
///   in-process backend (default: demo@lifeos.local / demo-password)
/// - `LIFEOS_JWT_SECRET`: Token signing key for the in-process backend, at
///   least 32 characters (default: random per run)
/// - `LIFEOS_POLL_INTERVAL_SECS`: `rest` polling period, 0 disables
///   (default: 30)
/// - `RUST_LOG`: Log filter (default: lifeos_cli=info,lifeos_client=info)
///
/// # Example
///
/// ```no_run
/// use lifeos_cli::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Using the {} backend", config.backend);
/// # Ok(())
/// # }
/// ```

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;

const DEFAULT_DEMO_EMAIL: &str = "demo@lifeos.local";
const DEFAULT_DEMO_PASSWORD: &str = "demo-password";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const MIN_SECRET_LEN: usize = 32;

/// Which backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// In-process backend, seeded with a demo account
    #[default]
    Memory,

    /// Hosted PostgREST/GoTrue backend
    Rest,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => f.write_str("memory"),
            Backend::Rest => f.write_str("rest"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "rest" => Ok(Backend::Rest),
            other => anyhow::bail!("Unknown backend '{}', expected memory or rest", other),
        }
    }
}

/// Hosted backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestSettings {
    /// Project URL
    pub url: String,

    /// Public API key
    pub anon_key: String,

    /// Polling period (`None` disables polling)
    pub poll_interval: Option<Duration>,
}

/// Account seeded into the in-process backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
}

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Selected backend
    pub backend: Backend,

    /// Hosted backend settings, when configured
    pub rest: Option<RestSettings>,

    /// Email to sign in with
    pub email: Option<String>,

    /// Password to sign in with
    pub password: Option<String>,

    /// Seeded account for the in-process backend
    pub demo: DemoAccount,

    /// Token signing key for the in-process backend
    ///
    /// Must be at least 32 characters.
    pub jwt_secret: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A variable has an invalid value
    /// - `rest` is selected without `LIFEOS_URL` and `LIFEOS_ANON_KEY`
    /// - `LIFEOS_JWT_SECRET` is shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("LIFEOS_BACKEND") {
            Some(value) => value.parse::<Backend>()?,
            None => Backend::default(),
        };

        let poll_secs = match lookup("LIFEOS_POLL_INTERVAL_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("LIFEOS_POLL_INTERVAL_SECS must be a number of seconds: {}", e)
            })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let rest = match (lookup("LIFEOS_URL"), lookup("LIFEOS_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(RestSettings {
                url,
                anon_key,
                poll_interval: (poll_secs > 0).then(|| Duration::from_secs(poll_secs)),
            }),
            _ => None,
        };

        let jwt_secret = lookup("LIFEOS_JWT_SECRET").unwrap_or_else(generate_secret);

        let config = Config {
            backend,
            rest,
            email: lookup("LIFEOS_EMAIL"),
            password: lookup("LIFEOS_PASSWORD"),
            demo: DemoAccount {
                email: lookup("LIFEOS_DEMO_EMAIL")
                    .unwrap_or_else(|| DEFAULT_DEMO_EMAIL.to_string()),
                password: lookup("LIFEOS_DEMO_PASSWORD")
                    .unwrap_or_else(|| DEFAULT_DEMO_PASSWORD.to_string()),
            },
            jwt_secret,
        };

        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn with_overrides(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(email) = &cli.email {
            self.email = Some(email.clone());
        }
        if let Some(password) = &cli.password {
            self.password = Some(password.clone());
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks cross-field requirements
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend == Backend::Rest && self.rest.is_none() {
            anyhow::bail!("LIFEOS_URL and LIFEOS_ANON_KEY are required for the rest backend");
        }

        if self.jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("LIFEOS_JWT_SECRET must be at least 32 characters long");
        }

        Ok(())
    }

    /// Credentials to sign in with at startup
    ///
    /// Explicit credentials win; the in-process backend falls back to the
    /// demo account.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.email, &self.password, self.backend) {
            (Some(email), Some(password), _) => Some((email.clone(), password.clone())),
            (None, None, Backend::Memory) => {
                Some((self.demo.email.clone(), self.demo.password.clone()))
            }
            _ => None,
        }
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
