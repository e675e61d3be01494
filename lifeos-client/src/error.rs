/// Client error types

use lifeos_shared::remote::RemoteError;
use uuid::Uuid;
use validator::ValidationErrors;

/// Task store error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Input rejected locally; no request was issued
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Record not present in the local cache
    #[error("Not found: {0}")]
    NotFound(String),

    /// Collection has not finished loading
    #[error("Data is still loading")]
    NotReady,

    /// The session this store was built for has ended
    #[error("Session has ended")]
    SessionEnded,

    /// Remote service failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Conversion failed and the created task was removed again
    #[error("Conversion rolled back: {0}")]
    ConversionRolledBack(RemoteError),

    /// Conversion failed and the created task could not be removed
    #[error("Conversion incomplete: task {task_id} was created but inbox item {item_id} remains ({cause})")]
    ConversionIncomplete {
        /// Orphaned task
        task_id: Uuid,

        /// Inbox item that was not removed
        item_id: Uuid,

        /// Failure that interrupted the conversion
        cause: RemoteError,
    },
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Validation(errors.to_string())
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Sign-in failure
///
/// Deliberately opaque: wrong credentials, a malformed email and an
/// unreachable service all look the same to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Sign-in failed")]
pub struct SignInFailed;
