/// Middleware modules for the web server
///
/// - `security`: Security headers and HSTS
/// - `https`: Redirection of plain-HTTP requests
/// - `session`: Session cookie authentication
/// - `panic`: Exception handler for panicking handlers

pub mod https;
pub mod panic;
pub mod security;
pub mod session;
