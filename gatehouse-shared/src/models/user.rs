/// User account model and store operations
///
/// This is the only entity the application works with directly. Accounts are
/// looked up by their normalized (upper-cased) user name, the way the identity
/// layer compares names case-insensitively.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY NOT NULL,
///     user_name TEXT NOT NULL,
///     normalized_user_name TEXT NOT NULL,      -- unique
///     email TEXT,
///     normalized_email TEXT,
///     email_confirmed BOOLEAN NOT NULL DEFAULT 0,
///     password_hash TEXT,
///     security_stamp TEXT NOT NULL,
///     concurrency_stamp TEXT NOT NULL,
///     phone_number TEXT,
///     phone_number_confirmed BOOLEAN NOT NULL DEFAULT 0,
///     two_factor_enabled BOOLEAN NOT NULL DEFAULT 0,
///     lockout_end TEXT,
///     lockout_enabled BOOLEAN NOT NULL DEFAULT 1,
///     access_failed_count INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// Every operation is generic over the executor so it can run on the pool or
/// on a connection already held by the caller (the startup routine does the
/// latter).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use uuid::Uuid;

macro_rules! user_columns {
    () => {
        "id, user_name, normalized_user_name, email, normalized_email, email_confirmed, \
         password_hash, security_stamp, concurrency_stamp, phone_number, \
         phone_number_confirmed, two_factor_enabled, lockout_end, lockout_enabled, \
         access_failed_count, created_at"
    };
}

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4 string)
    pub id: String,

    /// Login name
    pub user_name: String,

    /// Upper-cased user name used for lookups
    pub normalized_user_name: String,

    /// Email address
    pub email: Option<String>,

    /// Upper-cased email
    pub normalized_email: Option<String>,

    /// Whether the email address has been confirmed
    pub email_confirmed: bool,

    /// Argon2id password hash (PHC string); `None` for accounts without a password
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Random value regenerated whenever credentials change
    #[serde(skip_serializing)]
    pub security_stamp: String,

    /// Random value regenerated on every update
    pub concurrency_stamp: String,

    pub phone_number: Option<String>,

    pub phone_number_confirmed: bool,

    /// Whether sign-in requires a second factor
    pub two_factor_enabled: bool,

    /// Account is locked out until this instant
    pub lockout_end: Option<DateTime<Utc>>,

    /// Whether lockout applies to this account at all
    pub lockout_enabled: bool,

    /// Consecutive failed sign-in attempts
    pub access_failed_count: i32,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub user_name: String,
    pub email: Option<String>,
    pub email_confirmed: bool,

    /// Already-hashed password (never plaintext)
    pub password_hash: Option<String>,

    pub security_stamp: String,
    pub lockout_enabled: bool,
}

/// Normalizes a user name or email for case-insensitive lookups
pub fn normalize(value: &str) -> String {
    value.to_uppercase()
}

impl User {
    /// Whether the account is locked out at `now`
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }

    /// Inserts a new user and returns the stored row
    ///
    /// # Errors
    ///
    /// Returns a database error on unique-constraint violation of the
    /// normalized user name, or if the database is unavailable.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let normalized_user_name = normalize(&data.user_name);
        let normalized_email = data.email.as_deref().map(normalize);

        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (id, user_name, normalized_user_name, email, normalized_email, \
             email_confirmed, password_hash, security_stamp, concurrency_stamp, lockout_enabled, \
             created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING ",
            user_columns!()
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(data.user_name)
        .bind(normalized_user_name)
        .bind(data.email)
        .bind(normalized_email)
        .bind(data.email_confirmed)
        .bind(data.password_hash)
        .bind(data.security_stamp)
        .bind(Uuid::new_v4().to_string())
        .bind(data.lockout_enabled)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a user by user name (case-insensitive)
    pub async fn find_by_user_name<'e, E>(
        executor: E,
        user_name: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE normalized_user_name = ?"
        ))
        .bind(normalize(user_name))
        .fetch_optional(executor)
        .await
    }

    /// Counts user accounts
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }

    /// Increments the failed-attempt counter and returns the new value
    pub async fn increment_access_failed_count<'e, E>(
        executor: E,
        id: &str,
    ) -> Result<i32, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            "UPDATE users SET access_failed_count = access_failed_count + 1, \
             concurrency_stamp = ? WHERE id = ? RETURNING access_failed_count",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .fetch_one(executor)
        .await
    }

    /// Resets the failed-attempt counter to zero
    pub async fn reset_access_failed_count<'e, E>(executor: E, id: &str) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("UPDATE users SET access_failed_count = 0 WHERE id = ? AND access_failed_count <> 0")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Sets or clears the lockout end
    pub async fn set_lockout_end<'e, E>(
        executor: E,
        id: &str,
        lockout_end: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("UPDATE users SET lockout_end = ?, concurrency_stamp = ? WHERE id = ?")
            .bind(lockout_end)
            .bind(Uuid::new_v4().to_string())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Enables or disables two-factor sign-in
    pub async fn set_two_factor_enabled<'e, E>(
        executor: E,
        id: &str,
        enabled: bool,
    ) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("UPDATE users SET two_factor_enabled = ?, concurrency_stamp = ? WHERE id = ?")
            .bind(enabled)
            .bind(Uuid::new_v4().to_string())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4().to_string(),
            user_name: "someone@example.com".to_string(),
            normalized_user_name: "SOMEONE@EXAMPLE.COM".to_string(),
            email: Some("someone@example.com".to_string()),
            normalized_email: Some("SOMEONE@EXAMPLE.COM".to_string()),
            email_confirmed: true,
            password_hash: None,
            security_stamp: "stamp".to_string(),
            concurrency_stamp: "concurrency".to_string(),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: true,
            access_failed_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_upper_cases() {
        assert_eq!(normalize("test@gmail.com"), "TEST@GMAIL.COM");
        assert_eq!(normalize("Mixed.Case"), "MIXED.CASE");
    }

    #[test]
    fn test_lockout_in_future_locks() {
        let now = Utc::now();
        let mut user = sample_user();
        user.lockout_end = Some(now + Duration::minutes(5));
        assert!(user.is_locked_out(now));
    }

    #[test]
    fn test_lockout_in_past_does_not_lock() {
        let now = Utc::now();
        let mut user = sample_user();
        user.lockout_end = Some(now - Duration::minutes(5));
        assert!(!user.is_locked_out(now));
    }

    #[test]
    fn test_lockout_disabled_never_locks() {
        let now = Utc::now();
        let mut user = sample_user();
        user.lockout_enabled = false;
        user.lockout_end = Some(now + Duration::days(1));
        assert!(!user.is_locked_out(now));
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let mut user = sample_user();
        user.password_hash = Some("$argon2id$secret".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("security_stamp"));
    }
}
