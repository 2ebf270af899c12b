/// Password hashing and password policy
///
/// Hashes use Argon2id and are stored as PHC strings, so parameters and salt
/// travel with the hash and verification needs nothing else.
///
/// # Security
///
/// - **Algorithm**: Argon2id
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("!TestPassword123")?;
///
/// assert!(verify_password("!TestPassword123", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::collections::HashSet;

use super::identity::IdentityError;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Password policy enforced when accounts are created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordOptions {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_non_alphanumeric: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            required_length: 6,
            required_unique_chars: 1,
            require_non_alphanumeric: true,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
        }
    }
}

/// Hashes a password using Argon2id
///
/// Returns a PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` for a wrong password; errors are reserved for hashes
/// that cannot be parsed or checked at all.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the hash itself
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks a password against the policy, collecting every violation
///
/// An empty result means the password is acceptable.
pub fn validate_password(password: &str, options: &PasswordOptions) -> Vec<IdentityError> {
    let mut errors = Vec::new();

    if password.chars().count() < options.required_length {
        errors.push(IdentityError::new(
            "PasswordTooShort",
            format!(
                "Passwords must be at least {} characters.",
                options.required_length
            ),
        ));
    }

    if options.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(IdentityError::new(
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non alphanumeric character.",
        ));
    }

    if options.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(IdentityError::new(
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        ));
    }

    if options.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(IdentityError::new(
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase ('a'-'z').",
        ));
    }

    if options.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(IdentityError::new(
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase ('A'-'Z').",
        ));
    }

    let unique: HashSet<char> = password.chars().collect();
    if unique.len() < options.required_unique_chars {
        errors.push(IdentityError::new(
            "PasswordRequiresUniqueChars",
            format!(
                "Passwords must use at least {} different characters.",
                options.required_unique_chars
            ),
        ));
    }

    errors
}
