//! # Address Book Shared Library
//!
//! This crate contains the data layer and business rules used by the
//! address book API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `membership`: Contact/group membership validation and edge writes
//! - `auth`: Password hashing, JWT tokens, request auth context
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod membership;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
