/// Password sign-in
///
/// [`SignInManager::password_sign_in`] runs the checks in a fixed order:
///
/// 1. unknown user → `Failed`
/// 2. unconfirmed email while confirmation is required → `NotAllowed`
/// 3. account locked out → `LockedOut`
/// 4. wrong password → `Failed` (optionally counted towards lockout)
/// 5. two-factor account → `RequiresTwoFactor`
/// 6. otherwise → `Succeeded`, with a session token
///
/// None of these outcomes are errors; `Err` means the store itself failed.

use chrono::Utc;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, info, warn};

use super::identity::IdentityStoreError;
use super::session::{create_token, SessionClaims, SessionError, SessionKeys};
use super::user_manager::UserManager;
use crate::models::user::User;

/// Outcome of a credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInResult {
    Succeeded,
    LockedOut,
    NotAllowed,
    RequiresTwoFactor,
    Failed,
}

impl SignInResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, SignInResult::Succeeded)
    }
}

impl fmt::Display for SignInResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SignInResult::Succeeded => "Succeeded",
            SignInResult::LockedOut => "Lockedout",
            SignInResult::NotAllowed => "NotAllowed",
            SignInResult::RequiresTwoFactor => "RequiresTwoFactor",
            SignInResult::Failed => "Failed",
        };
        f.write_str(text)
    }
}

/// Result of a sign-in attempt plus the session token when it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub result: SignInResult,

    /// Signed session token, present only on success
    pub session_token: Option<String>,

    /// Whether the session should outlive the browser session
    pub is_persistent: bool,
}

impl SignInOutcome {
    fn rejected(result: SignInResult) -> Self {
        Self {
            result,
            session_token: None,
            is_persistent: false,
        }
    }
}

/// Errors that abort a sign-in attempt
#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error(transparent)]
    Store(#[from] IdentityStoreError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<sqlx::Error> for SignInError {
    fn from(err: sqlx::Error) -> Self {
        SignInError::Store(IdentityStoreError::Database(err))
    }
}

/// Checks credentials and issues session tokens
#[derive(Debug, Clone)]
pub struct SignInManager {
    pool: SqlitePool,
    users: UserManager,
    keys: SessionKeys,
}

impl SignInManager {
    pub fn new(pool: SqlitePool, users: UserManager, keys: SessionKeys) -> Self {
        Self { pool, users, keys }
    }

    pub fn users(&self) -> &UserManager {
        &self.users
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Signs a user in with a user name and password
    ///
    /// * `is_persistent` - whether the cookie outlives the browser session
    /// * `lockout_on_failure` - whether a wrong password counts towards lockout
    pub async fn password_sign_in(
        &self,
        user_name: &str,
        password: &str,
        is_persistent: bool,
        lockout_on_failure: bool,
    ) -> Result<SignInOutcome, SignInError> {
        let Some(user) = self.users.find_by_name(&self.pool, user_name).await? else {
            debug!(user_name, "Sign-in for unknown user");
            return Ok(SignInOutcome::rejected(SignInResult::Failed));
        };

        let outcome = self
            .check_password_sign_in(&user, password, is_persistent, lockout_on_failure)
            .await?;

        if outcome.result.succeeded() {
            info!(user_id = %user.id, user_name, "User signed in");
        } else {
            warn!(user_id = %user.id, user_name, result = %outcome.result, "Sign-in rejected");
        }

        Ok(outcome)
    }

    async fn check_password_sign_in(
        &self,
        user: &User,
        password: &str,
        is_persistent: bool,
        lockout_on_failure: bool,
    ) -> Result<SignInOutcome, SignInError> {
        let options = self.users.options();

        if options.sign_in.require_confirmed_account && !user.email_confirmed {
            return Ok(SignInOutcome::rejected(SignInResult::NotAllowed));
        }

        if user.is_locked_out(Utc::now()) {
            return Ok(SignInOutcome::rejected(SignInResult::LockedOut));
        }

        if !self.users.check_password(user, password)? {
            if lockout_on_failure && user.lockout_enabled {
                let failures = User::increment_access_failed_count(&self.pool, &user.id).await?;

                if failures >= options.lockout.max_failed_access_attempts {
                    let until = Utc::now() + options.lockout.default_lockout;
                    User::set_lockout_end(&self.pool, &user.id, Some(until)).await?;
                    User::reset_access_failed_count(&self.pool, &user.id).await?;
                    warn!(user_id = %user.id, until = %until, "Account locked out");
                    return Ok(SignInOutcome::rejected(SignInResult::LockedOut));
                }
            }

            return Ok(SignInOutcome::rejected(SignInResult::Failed));
        }

        User::reset_access_failed_count(&self.pool, &user.id).await?;

        if user.two_factor_enabled {
            return Ok(SignInOutcome::rejected(SignInResult::RequiresTwoFactor));
        }

        let claims = SessionClaims::new(&user.id, &user.user_name, &user.security_stamp);
        let token = create_token(&claims, &self.keys)?;

        Ok(SignInOutcome {
            result: SignInResult::Succeeded,
            session_token: Some(token),
            is_persistent,
        })
    }
}
