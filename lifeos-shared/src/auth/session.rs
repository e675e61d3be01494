/// Session types
///
/// A [`Session`] is what the session service hands back after a successful
/// password sign-in: the user's identity plus the bearer token every data
/// request must present. [`CurrentUser`] is the identity-only view exposed to
/// the rest of the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User ID
    pub user_id: Uuid,

    /// User email
    pub email: String,
}

/// An authenticated session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Who is signed in
    pub user: CurrentUser,

    /// Bearer token presented on every data request
    pub access_token: String,

    /// When the access token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// User ID shortcut
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    /// Checks if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// Keep the bearer token out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Password sign-in request
#[derive(Clone, Deserialize, Validate)]
pub struct SignInRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl SignInRequest {
    /// Builds a request, trimming the email
    pub fn new(email: &str, password: &str) -> Self {
        SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
