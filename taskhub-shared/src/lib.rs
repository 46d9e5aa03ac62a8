//! # Taskhub Shared Library
//!
//! This crate contains the types and data access shared by the taskhub API
//! server binary and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their query operations
//! - `listing`: Filter/sort/paginate building blocks shared by all listings
//! - `auth`: Password hashing and JWT utilities
//! - `storage`: Image store for uploaded files
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod listing;
pub mod models;
pub mod storage;

/// Current version of the taskhub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
