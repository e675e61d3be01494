/// Inbox item model
///
/// An inbox item is a free-text note captured before any structure is
/// applied. It lives in the `inbox` collection until it is deleted or
/// converted into a task.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE inbox (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES auth.users(id) ON DELETE CASCADE,
///     text TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A captured note awaiting triage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxItem {
    /// Server-assigned identifier
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Captured text
    pub text: String,

    /// When the item was captured (server clock)
    pub created_at: DateTime<Utc>,
}

/// Input for capturing a new inbox item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInboxItem {
    /// Captured text, trimmed
    #[validate(custom(function = "crate::models::validate_not_blank"))]
    pub text: String,
}

impl NewInboxItem {
    /// Builds a capture request, trimming surrounding whitespace
    pub fn new(text: &str) -> Self {
        NewInboxItem {
            text: text.trim().to_string(),
        }
    }
}
