//! # LifeOS Shared Library
//!
//! This crate contains the domain types and the remote service contracts used
//! by the LifeOS client and command-line front end.
//!
//! ## Module Organization
//!
//! - `models`: Inbox items, tasks, priorities and categories
//! - `auth`: Password hashing, access tokens and session types
//! - `remote`: Data/session service contracts and their backends

pub mod auth;
pub mod models;
pub mod remote;

/// Current version of the LifeOS shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
