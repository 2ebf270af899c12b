/// Startup routine: apply pending migrations, then seed the test account
///
/// Runs once before the server accepts requests. The account is only created
/// when there was something to migrate, so a database that is already up to
/// date is left alone even if the account is missing. When migrations are
/// pending but the account already exists (a previous run failed after
/// creating it), creation is skipped instead of failing.
///
/// Failures never abort startup: they are logged and reported as
/// [`SeedOutcome::Failed`].
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::auth::identity::IdentityOptions;
/// use gatehouse_shared::auth::user_manager::UserManager;
/// use gatehouse_shared::db::seed::migrate_and_seed;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) {
/// let users = UserManager::new(IdentityOptions::default());
/// let outcome = migrate_and_seed(&pool, &users).await;
/// println!("{:?}", outcome);
/// # }
/// ```

use sqlx::migrate::MigrateError;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use super::migrations::{apply_migration, pending_migrations};
use crate::auth::identity::{IdentityResult, IdentityStoreError};
use crate::auth::user_manager::{NewUser, UserManager};

/// User name and email of the seeded test account
pub const SEED_USER_NAME: &str = "test@gmail.com";

/// Password of the seeded test account
pub const SEED_PASSWORD: &str = "!TestPassword123";

/// What the startup routine did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// No migrations were pending; nothing was changed
    UpToDate,

    /// Pending migrations were applied
    Migrated {
        /// Versions applied, in order
        applied: Vec<i64>,

        /// Whether the test account was created
        seeded: bool,
    },

    /// Something failed; the message was logged
    Failed(String),
}

/// Errors raised inside the startup routine
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Could not acquire a database connection: {0}")]
    Connection(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] MigrateError),

    #[error(transparent)]
    Identity(#[from] IdentityStoreError),

    #[error("Seed account was rejected: {0}")]
    Rejected(IdentityResult),
}

/// Applies pending migrations and seeds the test account, logging any failure
pub async fn migrate_and_seed(pool: &SqlitePool, users: &UserManager) -> SeedOutcome {
    match try_migrate_and_seed(pool, users).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            SeedOutcome::Failed(e.to_string())
        }
    }
}

async fn try_migrate_and_seed(
    pool: &SqlitePool,
    users: &UserManager,
) -> Result<SeedOutcome, SeedError> {
    // Held for the whole routine and returned to the pool on drop
    let mut conn = pool.acquire().await?;

    let pending = pending_migrations(&mut conn).await?;
    if pending.is_empty() {
        debug!("Database is up to date, skipping seed");
        return Ok(SeedOutcome::UpToDate);
    }

    info!(pending = pending.len(), "Applying pending migrations");

    let mut applied = Vec::with_capacity(pending.len());
    for migration in pending {
        apply_migration(&mut conn, migration).await?;
        applied.push(migration.version);
    }

    let seeded = seed_test_user(&mut conn, users).await?;

    Ok(SeedOutcome::Migrated { applied, seeded })
}

async fn seed_test_user(
    conn: &mut SqliteConnection,
    users: &UserManager,
) -> Result<bool, SeedError> {
    if users.find_by_name(&mut *conn, SEED_USER_NAME).await?.is_some() {
        warn!(user_name = SEED_USER_NAME, "Seed account already exists, skipping");
        return Ok(false);
    }

    let result = users
        .create(
            &mut *conn,
            NewUser::with_email(SEED_USER_NAME).confirmed(),
            SEED_PASSWORD,
        )
        .await?;

    if !result.succeeded() {
        return Err(SeedError::Rejected(result));
    }

    info!(user_name = SEED_USER_NAME, "Seed account created");
    Ok(true)
}
