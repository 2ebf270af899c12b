/// User manager: validated account creation and lookup
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::auth::identity::IdentityOptions;
/// use gatehouse_shared::auth::user_manager::{NewUser, UserManager};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = UserManager::new(IdentityOptions::default());
///
/// let result = manager
///     .create(&pool, NewUser::with_email("someone@example.com"), "Str0ng!Pass")
///     .await?;
///
/// if !result.succeeded() {
///     eprintln!("rejected: {}", result);
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::{Acquire, Sqlite, SqliteExecutor};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::identity::{IdentityError, IdentityOptions, IdentityResult, IdentityStoreError};
use super::password::{hash_password, validate_password, verify_password};
use crate::models::user::{CreateUser, User};

/// Characters permitted in user names
pub const ALLOWED_USER_NAME_CHARACTERS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";

/// Account details supplied by the caller; the password is passed separately
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_name: String,
    pub email: Option<String>,
    pub email_confirmed: bool,
}

impl NewUser {
    /// An account whose user name is its email address
    pub fn with_email(email: &str) -> Self {
        Self {
            user_name: email.to_string(),
            email: Some(email.to_string()),
            email_confirmed: false,
        }
    }

    /// Marks the email as already confirmed
    pub fn confirmed(mut self) -> Self {
        self.email_confirmed = true;
        self
    }
}

/// Creates and looks up user accounts under the configured policy
#[derive(Debug, Clone)]
pub struct UserManager {
    options: Arc<IdentityOptions>,
}

impl UserManager {
    pub fn new(options: IdentityOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    /// Creates an account with the given password
    ///
    /// Validation failures (bad user name, weak password, duplicate name) come
    /// back as `IdentityResult::Failed`; only database or hashing failures are
    /// errors. Accepts a pool or a connection the caller already holds.
    pub async fn create<'a, A>(
        &self,
        db: A,
        user: NewUser,
        password: &str,
    ) -> Result<IdentityResult, IdentityStoreError>
    where
        A: Acquire<'a, Database = Sqlite>,
    {
        let mut errors = validate_user_name(&user.user_name);
        errors.extend(validate_password(password, &self.options.password));

        let mut conn = db.acquire().await?;

        if User::find_by_user_name(&mut *conn, &user.user_name)
            .await?
            .is_some()
        {
            errors.push(IdentityError::new(
                "DuplicateUserName",
                format!("Username '{}' is already taken.", user.user_name),
            ));
        }

        if !errors.is_empty() {
            debug!(
                user_name = %user.user_name,
                errors = errors.len(),
                "User creation rejected"
            );
            return Ok(IdentityResult::Failed(errors));
        }

        let password_hash = hash_password(password)?;

        let created = User::create(
            &mut *conn,
            CreateUser {
                user_name: user.user_name,
                email: user.email,
                email_confirmed: user.email_confirmed,
                password_hash: Some(password_hash),
                security_stamp: new_security_stamp(),
                lockout_enabled: self.options.lockout.allowed_for_new_users,
            },
        )
        .await?;

        info!(user_id = %created.id, user_name = %created.user_name, "User created");
        Ok(IdentityResult::Success)
    }

    /// Finds an account by user name (case-insensitive)
    pub async fn find_by_name<'e, E>(
        &self,
        executor: E,
        user_name: &str,
    ) -> Result<Option<User>, IdentityStoreError>
    where
        E: SqliteExecutor<'e>,
    {
        Ok(User::find_by_user_name(executor, user_name).await?)
    }

    /// Checks a password against the account's stored hash
    ///
    /// Accounts without a password never match.
    pub fn check_password(&self, user: &User, password: &str) -> Result<bool, IdentityStoreError> {
        match user.password_hash.as_deref() {
            Some(hash) => Ok(verify_password(password, hash)?),
            None => Ok(false),
        }
    }
}

/// Validates a user name against the allowed character set
pub fn validate_user_name(user_name: &str) -> Vec<IdentityError> {
    if user_name.is_empty()
        || !user_name
            .chars()
            .all(|c| ALLOWED_USER_NAME_CHARACTERS.contains(c))
    {
        return vec![IdentityError::new(
            "InvalidUserName",
            format!(
                "Username '{}' is invalid, can only contain letters or digits.",
                user_name
            ),
        )];
    }

    Vec::new()
}

fn new_security_stamp() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}
