/// Command errors
///
/// Everything a command can fail with. The shell prints these and keeps
/// going; one-shot commands turn them into a non-zero exit.

use lifeos_client::{SignInFailed, StoreError};
use lifeos_shared::remote::RemoteError;

/// Command result type alias
pub type CliResult<T> = Result<T, CliError>;

/// Command error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The command needs a signed-in user
    #[error("Not signed in. Use `login <email> <password>` first")]
    NotSignedIn,

    #[error(transparent)]
    SignIn(#[from] SignInFailed),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A `<ref>` did not name exactly one record
    #[error("{0}")]
    Reference(String),
}
