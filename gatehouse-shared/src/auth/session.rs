/// Session tokens carried in the application cookie
///
/// A successful sign-in issues an HS256-signed JWT naming the user. The web
/// layer carries it in the `HttpOnly` cookie named [`SESSION_COOKIE_NAME`];
/// every request that presents a valid one is treated as that user.
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::session::{create_token, validate_token, SessionClaims, SessionKeys};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = SessionKeys::from_secret("a-secret-of-at-least-thirty-two-bytes!!");
///
/// let claims = SessionClaims::new("user-id", "test@gmail.com", "STAMP");
/// let token = create_token(&claims, &keys)?;
///
/// let validated = validate_token(&token, &keys)?;
/// assert_eq!(validated.name, "test@gmail.com");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer claim stamped on every session token
pub const ISSUER: &str = "gatehouse";

/// Name of the application cookie
pub const SESSION_COOKIE_NAME: &str = "gatehouse.session";

/// Session token lifetime, also the `Max-Age` of a persistent cookie
pub fn session_lifetime() -> Duration {
    Duration::days(14)
}

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to create token
    #[error("Failed to create session token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Session token has expired")]
    Expired,

    /// Signature, issuer or format check failed
    #[error("Invalid session token: {0}")]
    Invalid(String),
}

/// Signing keys for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Random keys for a single process; sessions do not survive a restart
    pub fn generate() -> Self {
        let mut secret = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut secret);

        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
        }
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

/// JWT claims of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user ID
    pub sub: String,

    /// User name at sign-in time
    pub name: String,

    /// Issuer - always "gatehouse"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Security stamp of the account when the token was issued
    pub stamp: String,
}

impl SessionClaims {
    /// Creates claims with the default session lifetime
    pub fn new(user_id: &str, user_name: &str, security_stamp: &str) -> Self {
        Self::with_expiration(user_id, user_name, security_stamp, session_lifetime())
    }

    pub fn with_expiration(
        user_id: &str,
        user_name: &str,
        security_stamp: &str,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            name: user_name.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            stamp: security_stamp.to_string(),
        }
    }
}

/// The signed-in user resolved from a request's session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub user_name: String,
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            user_name: claims.name,
        }
    }
}

/// Signs claims into a token
pub fn create_token(claims: &SessionClaims, keys: &SessionKeys) -> Result<String, SessionError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, issuer, expiry and not-before, then returns the claims
pub fn validate_token(token: &str, keys: &SessionKeys) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data =
        decode::<SessionClaims>(token, &keys.decoding, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e.to_string()),
        })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_create_and_validate_token() {
        let keys = SessionKeys::from_secret(SECRET);
        let claims = SessionClaims::new("user-1", "test@gmail.com", "STAMP");

        let token = create_token(&claims, &keys).unwrap();
        let validated = validate_token(&token, &keys).unwrap();

        assert_eq!(validated, claims);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_token_from_other_keys_is_rejected() {
        let claims = SessionClaims::new("user-1", "test@gmail.com", "STAMP");
        let token = create_token(&claims, &SessionKeys::generate()).unwrap();

        let result = validate_token(&token, &SessionKeys::generate());
        assert!(matches!(result, Err(SessionError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = SessionKeys::from_secret(SECRET);
        let claims =
            SessionClaims::with_expiration("user-1", "test@gmail.com", "STAMP", Duration::hours(-1));
        let token = create_token(&claims, &keys).unwrap();

        assert!(matches!(validate_token(&token, &keys), Err(SessionError::Expired)));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let keys = SessionKeys::from_secret(SECRET);
        assert!(validate_token("not.a.token", &keys).is_err());
    }

    #[test]
    fn test_current_user_from_claims() {
        let user: CurrentUser = SessionClaims::new("user-1", "test@gmail.com", "STAMP").into();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.user_name, "test@gmail.com");
    }
}
