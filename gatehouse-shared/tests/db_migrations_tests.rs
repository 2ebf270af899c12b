/// Integration tests for the embedded migrations
///
/// Each test opens its own in-memory SQLite database, so they can run in
/// parallel without external services.

use gatehouse_shared::db::migrations::{
    apply_migration, get_migration_status, pending_migrations, run_migrations, MIGRATOR,
};
use gatehouse_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use sqlx::SqlitePool;

async fn fresh_pool() -> SqlitePool {
    create_pool(DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool")
}

fn embedded_versions() -> Vec<i64> {
    MIGRATOR.iter().map(|m| m.version).collect()
}

#[tokio::test]
async fn test_fresh_database_has_every_migration_pending() {
    let pool = fresh_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let pending: Vec<i64> = pending_migrations(&mut conn)
        .await
        .expect("Failed to list pending migrations")
        .iter()
        .map(|m| m.version)
        .collect();

    assert_eq!(pending, embedded_versions());
}

#[tokio::test]
async fn test_run_migrations() {
    let pool = fresh_pool().await;

    let applied = run_migrations(&pool).await.expect("Migrations failed");
    assert_eq!(applied, embedded_versions());

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert!(tables.contains(&"users".to_string()));
    assert!(tables.contains(&"user_roles".to_string()));

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = fresh_pool().await;

    run_migrations(&pool).await.expect("First migration run failed");
    let second = run_migrations(&pool).await.expect("Second migration run failed");

    assert!(second.is_empty(), "Second run should apply nothing");
}

#[tokio::test]
async fn test_pending_shrinks_as_migrations_apply() {
    let pool = fresh_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let pending = pending_migrations(&mut conn).await.unwrap();
    assert!(pending.len() >= 2);

    apply_migration(&mut conn, pending[0]).await.expect("First migration failed");

    let remaining: Vec<i64> = pending_migrations(&mut conn)
        .await
        .unwrap()
        .iter()
        .map(|m| m.version)
        .collect();
    assert_eq!(remaining, embedded_versions()[1..].to_vec());
}

#[tokio::test]
async fn test_get_migration_status_before_and_after() {
    let pool = fresh_pool().await;

    let before = get_migration_status(&pool).await.expect("Failed to get status");
    assert!(before.applied.is_empty());
    assert_eq!(before.pending.len(), embedded_versions().len());
    assert!(!before.is_up_to_date());

    run_migrations(&pool).await.unwrap();

    let after = get_migration_status(&pool).await.expect("Failed to get status");
    assert!(after.pending.is_empty());
    assert_eq!(after.applied.len(), embedded_versions().len());
    assert!(after.is_up_to_date());
}
