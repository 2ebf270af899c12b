//! # Gatehouse Shared Library
//!
//! Persistence and identity services used by the Gatehouse web server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, embedded migrations and the startup seed routine
//! - `models`: Database models
//! - `auth`: Password hashing, user manager, sign-in manager and session tokens

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Gatehouse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
