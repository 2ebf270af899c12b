/// Identity layer
///
/// This module provides the account and sign-in services the web layer uses:
///
/// - `identity`: Options, results and error types shared by the managers
/// - `password`: Argon2id hashing and password policy
/// - `user_manager`: Validated account creation and lookup
/// - `sign_in`: Password sign-in producing a `SignInResult`
/// - `session`: Signed session tokens carried in the application cookie
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::auth::identity::IdentityOptions;
/// use gatehouse_shared::auth::session::SessionKeys;
/// use gatehouse_shared::auth::sign_in::SignInManager;
/// use gatehouse_shared::auth::user_manager::UserManager;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let users = UserManager::new(IdentityOptions::default());
/// let sign_in = SignInManager::new(pool, users, SessionKeys::generate());
///
/// let outcome = sign_in
///     .password_sign_in("test@gmail.com", "!TestPassword123", false, false)
///     .await?;
/// println!("SignInResult: {}", outcome.result);
/// # Ok(())
/// # }
/// ```

pub mod identity;
pub mod password;
pub mod session;
pub mod sign_in;
pub mod user_manager;
