/// Identity options, results and errors shared by the user and sign-in managers

use chrono::Duration;
use std::fmt;

use super::password::{PasswordError, PasswordOptions};

/// Lockout policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutOptions {
    /// Whether new accounts are subject to lockout
    pub allowed_for_new_users: bool,

    /// Failed attempts before an account is locked
    pub max_failed_access_attempts: i32,

    /// How long a lockout lasts
    pub default_lockout: Duration,
}

impl Default for LockoutOptions {
    fn default() -> Self {
        Self {
            allowed_for_new_users: true,
            max_failed_access_attempts: 5,
            default_lockout: Duration::minutes(5),
        }
    }
}

/// Preconditions checked before a password sign-in is allowed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignInOptions {
    /// Reject sign-in until the account's email has been confirmed
    pub require_confirmed_account: bool,
}

/// All identity settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityOptions {
    pub password: PasswordOptions,
    pub lockout: LockoutOptions,
    pub sign_in: SignInOptions,
}

/// A single reason an identity operation was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    /// Stable machine-readable code, e.g. `DuplicateUserName`
    pub code: String,

    /// Human-readable explanation
    pub description: String,
}

impl IdentityError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Outcome of an operation that can be rejected by validation
///
/// Rejections are ordinary values. Infrastructure failures travel separately
/// as [`IdentityStoreError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResult {
    Success,
    Failed(Vec<IdentityError>),
}

impl IdentityResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, IdentityResult::Success)
    }

    pub fn errors(&self) -> &[IdentityError] {
        match self {
            IdentityResult::Success => &[],
            IdentityResult::Failed(errors) => errors,
        }
    }
}

impl fmt::Display for IdentityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityResult::Success => write!(f, "Succeeded"),
            IdentityResult::Failed(errors) => {
                let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
                write!(f, "Failed : {}", codes.join(","))
            }
        }
    }
}

/// Infrastructure failure inside the identity layer
#[derive(Debug, thiserror::Error)]
pub enum IdentityStoreError {
    #[error("Identity store database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),
}
