/// Database migration inspection and application
///
/// The identity schema ships as versioned SQL files embedded at compile time
/// from the `migrations/` directory at the workspace root. Each file is named
/// `{timestamp}_{name}.sql`; the timestamp is the version and defines order.
///
/// Besides the all-in-one [`run_migrations`], this module exposes the two
/// steps separately so startup code can see what is pending before applying:
///
/// ```no_run
/// use gatehouse_shared::db::migrations::{apply_migration, pending_migrations};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = pool.acquire().await?;
///
/// for migration in pending_migrations(&mut conn).await? {
///     apply_migration(&mut conn, migration).await?;
/// }
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::migrate::{Migrate, MigrateError, Migration, Migrator};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Embedded identity schema migrations, ordered by version
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Summary of one migration for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationInfo {
    /// Version (timestamp prefix of the file name)
    pub version: i64,

    /// Human-readable description derived from the file name
    pub description: String,
}

impl From<&Migration> for MigrationInfo {
    fn from(migration: &Migration) -> Self {
        Self {
            version: migration.version,
            description: migration.description.to_string(),
        }
    }
}

/// Applied and pending migrations of a database
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Migrations already recorded as applied, oldest first
    pub applied: Vec<MigrationInfo>,

    /// Migrations known to this build but not applied yet, oldest first
    pub pending: Vec<MigrationInfo>,
}

impl MigrationStatus {
    /// Whether the database schema is up to date
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Lists the migrations that have not been applied yet, in version order
///
/// Creates the bookkeeping table when it does not exist, so a fresh database
/// reports every embedded migration as pending.
///
/// # Errors
///
/// - `MigrateError::Dirty` if a previous migration failed half-way
/// - `MigrateError::VersionMismatch` if an applied migration's checksum no
///   longer matches the embedded file
/// - `MigrateError::Execute` on database failures
pub async fn pending_migrations(
    conn: &mut SqliteConnection,
) -> Result<Vec<&'static Migration>, MigrateError> {
    conn.ensure_migrations_table().await?;

    if let Some(version) = conn.dirty_version().await? {
        warn!(version, "Database has a partially applied migration");
        return Err(MigrateError::Dirty(version));
    }

    let applied: HashMap<i64, _> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| (m.version, m.checksum))
        .collect();

    let mut pending = Vec::new();
    for migration in MIGRATOR.iter() {
        if migration.migration_type.is_down_migration() {
            continue;
        }

        match applied.get(&migration.version) {
            Some(checksum) if *checksum != migration.checksum => {
                return Err(MigrateError::VersionMismatch(migration.version));
            }
            Some(_) => {}
            None => pending.push(migration),
        }
    }

    debug!(pending = pending.len(), "Pending migrations listed");
    Ok(pending)
}

/// Applies a single migration and records it as applied
///
/// # Errors
///
/// Returns an error if the migration SQL fails; the migration is then left
/// unrecorded (or recorded as dirty) and later runs refuse to continue.
pub async fn apply_migration(
    conn: &mut SqliteConnection,
    migration: &Migration,
) -> Result<(), MigrateError> {
    info!(
        version = migration.version,
        description = %migration.description,
        "Applying migration"
    );

    let elapsed = conn.apply(migration).await?;

    debug!(
        version = migration.version,
        elapsed_ms = elapsed.as_millis() as u64,
        "Migration applied"
    );
    Ok(())
}

/// Applies every pending migration in order, stopping at the first failure
///
/// Returns the versions that were applied.
pub async fn apply_pending(conn: &mut SqliteConnection) -> Result<Vec<i64>, MigrateError> {
    let pending = pending_migrations(conn).await?;
    let mut applied = Vec::with_capacity(pending.len());

    for migration in pending {
        apply_migration(conn, migration).await?;
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Runs all pending database migrations on a pool
///
/// # Errors
///
/// Returns an error if a connection cannot be acquired or any migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<Vec<i64>, MigrateError> {
    info!("Starting database migrations");

    let mut conn = pool.acquire().await?;

    match apply_pending(&mut conn).await {
        Ok(applied) => {
            info!(applied = applied.len(), "Database migrations completed");
            Ok(applied)
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Gets the applied and pending migrations of a database
pub async fn get_migration_status(pool: &SqlitePool) -> Result<MigrationStatus, MigrateError> {
    let mut conn = pool.acquire().await?;

    let pending: Vec<MigrationInfo> = pending_migrations(&mut conn)
        .await?
        .into_iter()
        .map(MigrationInfo::from)
        .collect();

    let applied = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !pending.iter().any(|p| p.version == m.version))
        .map(MigrationInfo::from)
        .collect();

    Ok(MigrationStatus { applied, pending })
}
