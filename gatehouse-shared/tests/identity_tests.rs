/// Integration tests for the user manager and password sign-in

use chrono::{Duration, Utc};
use gatehouse_shared::auth::identity::{IdentityOptions, IdentityResult, SignInOptions};
use gatehouse_shared::auth::session::{validate_token, SessionKeys};
use gatehouse_shared::auth::sign_in::{SignInManager, SignInResult};
use gatehouse_shared::auth::user_manager::{NewUser, UserManager};
use gatehouse_shared::db::migrations::run_migrations;
use gatehouse_shared::db::pool::{create_pool, DatabaseConfig};
use gatehouse_shared::models::user::User;
use sqlx::SqlitePool;

const PASSWORD: &str = "Corr3ct!Horse";

async fn migrated_pool() -> SqlitePool {
    let pool = create_pool(DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool");

    run_migrations(&pool).await.expect("Migrations failed");
    pool
}

fn options(require_confirmed_account: bool) -> IdentityOptions {
    IdentityOptions {
        sign_in: SignInOptions {
            require_confirmed_account,
        },
        ..Default::default()
    }
}

async fn sign_in_manager(pool: &SqlitePool) -> SignInManager {
    SignInManager::new(
        pool.clone(),
        UserManager::new(options(true)),
        SessionKeys::generate(),
    )
}

async fn create_user(manager: &SignInManager, pool: &SqlitePool, user: NewUser) -> User {
    let name = user.user_name.clone();
    let result = manager.users().create(pool, user, PASSWORD).await.unwrap();
    assert!(result.succeeded(), "create failed: {}", result);

    User::find_by_user_name(pool, &name).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_create_user_hashes_password() {
    let pool = migrated_pool().await;
    let manager = UserManager::new(IdentityOptions::default());

    let result = manager
        .create(&pool, NewUser::with_email("someone@example.com"), PASSWORD)
        .await
        .unwrap();
    assert_eq!(result, IdentityResult::Success);

    let user = manager
        .find_by_name(&pool, "SOMEONE@example.COM")
        .await
        .unwrap()
        .expect("lookup should be case-insensitive");

    assert_eq!(user.normalized_user_name, "SOMEONE@EXAMPLE.COM");
    assert!(!user.email_confirmed);
    assert!(user.lockout_enabled);
    assert_eq!(user.access_failed_count, 0);
    assert!(user.password_hash.as_deref().unwrap().starts_with("$argon2id$"));
    assert!(manager.check_password(&user, PASSWORD).unwrap());
    assert!(!manager.check_password(&user, "nope").unwrap());
}

#[tokio::test]
async fn test_create_duplicate_user_is_rejected() {
    let pool = migrated_pool().await;
    let manager = UserManager::new(IdentityOptions::default());

    manager
        .create(&pool, NewUser::with_email("dup@example.com"), PASSWORD)
        .await
        .unwrap();
    let second = manager
        .create(&pool, NewUser::with_email("DUP@example.com"), PASSWORD)
        .await
        .unwrap();

    assert_eq!(second.errors().len(), 1);
    assert_eq!(second.errors()[0].code, "DuplicateUserName");
    assert_eq!(User::count(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_user_with_weak_password_is_rejected() {
    let pool = migrated_pool().await;
    let manager = UserManager::new(IdentityOptions::default());

    let result = manager
        .create(&pool, NewUser::with_email("weak@example.com"), "password")
        .await
        .unwrap();

    assert!(!result.succeeded());
    assert_eq!(User::count(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sign_in_succeeds_and_issues_session_token() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    let user = create_user(&manager, &pool, NewUser::with_email("ok@example.com").confirmed()).await;

    let outcome = manager
        .password_sign_in("ok@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::Succeeded);

    assert!(!outcome.is_persistent);

    let token = outcome.session_token.expect("token should be issued");
    let claims = validate_token(&token, manager.keys()).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.name, "ok@example.com");
}

#[tokio::test]
async fn test_persistent_sign_in_is_flagged() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    create_user(&manager, &pool, NewUser::with_email("keep@example.com").confirmed()).await;

    let outcome = manager
        .password_sign_in("keep@example.com", PASSWORD, true, false)
        .await
        .unwrap();

    assert!(outcome.is_persistent);
    assert!(outcome.session_token.is_some());
}

#[tokio::test]
async fn test_wrong_password_fails_without_counting() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    let user = create_user(&manager, &pool, NewUser::with_email("ok@example.com").confirmed()).await;

    let outcome = manager
        .password_sign_in("ok@example.com", "Wr0ng!Horse", false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::Failed);
    assert!(outcome.session_token.is_none());

    let reloaded = User::find_by_id(&pool, &user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.access_failed_count, 0);
}

#[tokio::test]
async fn test_unknown_user_fails() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;

    let outcome = manager
        .password_sign_in("nobody@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::Failed);
}

#[tokio::test]
async fn test_unconfirmed_account_is_not_allowed() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    create_user(&manager, &pool, NewUser::with_email("new@example.com")).await;

    let outcome = manager
        .password_sign_in("new@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::NotAllowed);
}

#[tokio::test]
async fn test_unconfirmed_account_allowed_when_confirmation_not_required() {
    let pool = migrated_pool().await;
    let manager = SignInManager::new(
        pool.clone(),
        UserManager::new(options(false)),
        SessionKeys::generate(),
    );
    create_user(&manager, &pool, NewUser::with_email("new@example.com")).await;

    let outcome = manager
        .password_sign_in("new@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::Succeeded);
}

#[tokio::test]
async fn test_locked_out_account() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    let user = create_user(&manager, &pool, NewUser::with_email("locked@example.com").confirmed()).await;

    User::set_lockout_end(&pool, &user.id, Some(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();

    let outcome = manager
        .password_sign_in("locked@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::LockedOut);
}

#[tokio::test]
async fn test_expired_lockout_no_longer_applies() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    let user = create_user(&manager, &pool, NewUser::with_email("was-locked@example.com").confirmed()).await;

    User::set_lockout_end(&pool, &user.id, Some(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    let outcome = manager
        .password_sign_in("was-locked@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::Succeeded);
}

#[tokio::test]
async fn test_two_factor_account_requires_second_factor() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    let user = create_user(&manager, &pool, NewUser::with_email("2fa@example.com").confirmed()).await;

    User::set_two_factor_enabled(&pool, &user.id, true).await.unwrap();

    let outcome = manager
        .password_sign_in("2fa@example.com", PASSWORD, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.result, SignInResult::RequiresTwoFactor);
    assert!(outcome.session_token.is_none());
}

#[tokio::test]
async fn test_repeated_failures_lock_account_when_counting() {
    let pool = migrated_pool().await;
    let manager = sign_in_manager(&pool).await;
    create_user(&manager, &pool, NewUser::with_email("target@example.com").confirmed()).await;

    let max = manager.users().options().lockout.max_failed_access_attempts;
    for attempt in 1..max {
        let outcome = manager
            .password_sign_in("target@example.com", "Wr0ng!Horse", false, true)
            .await
            .unwrap();
        assert_eq!(outcome.result, SignInResult::Failed, "attempt {}", attempt);
    }

    let last = manager
        .password_sign_in("target@example.com", "Wr0ng!Horse", false, true)
        .await
        .unwrap();
    assert_eq!(last.result, SignInResult::LockedOut);

    // Correct password is refused while the lockout lasts
    let correct = manager
        .password_sign_in("target@example.com", PASSWORD, false, true)
        .await
        .unwrap();
    assert_eq!(correct.result, SignInResult::LockedOut);

    let user = User::find_by_user_name(&pool, "target@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.access_failed_count, 0);
    assert!(user.lockout_end.is_some());
}
