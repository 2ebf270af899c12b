//! # Gatehouse Web Server Library
//!
//! Router, configuration and request handling for the Gatehouse server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Layered configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers, HTTPS redirection, sessions, panics
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
