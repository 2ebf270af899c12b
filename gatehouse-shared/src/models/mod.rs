/// Database models for Gatehouse
///
/// # Models
///
/// - `user`: User accounts owned by the identity layer
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::models::user::User;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_user_name(&pool, "test@gmail.com").await? {
///     println!("Found user: {}", user.id);
/// }
/// # Ok(())
/// # }
/// ```

pub mod user;
