/// Route handlers
///
/// - `login`: Credential check endpoint (`/api/LoginUser`)
/// - `pages`: Index and error pages
/// - `health`: Health check endpoint
/// - `dev`: Development-only diagnostics (migrations, API description)

pub mod dev;
pub mod health;
pub mod login;
pub mod pages;
