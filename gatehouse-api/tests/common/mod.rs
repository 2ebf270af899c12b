/// Common test utilities for integration tests
///
/// Each context gets its own in-memory SQLite database, migrated and seeded
/// the way the server does at startup, and a router built over it.

use axum::body::Body;
use axum::http::{Request, Response};
use gatehouse_api::app::{app_routes, build_router, with_middleware, AppState};
use gatehouse_api::config::{Config, Environment};
use gatehouse_shared::auth::user_manager::NewUser;
use gatehouse_shared::db::pool::create_pool;
use gatehouse_shared::db::seed::{migrate_and_seed, SeedOutcome};
use gatehouse_shared::models::user::User;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SESSION_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Password used for accounts created by tests
pub const PASSWORD: &str = "Corr3ct!Horse";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub state: AppState,
    pub app: axum::Router,

    /// Static files root; removed on drop
    pub static_root: TempDir,
}

impl TestContext {
    pub async fn new(environment: Environment) -> anyhow::Result<Self> {
        Self::with_config(environment, |_| {}).await
    }

    /// Builds a context after letting the caller adjust the configuration
    pub async fn with_config(
        environment: Environment,
        customize: impl FnOnce(&mut Config),
    ) -> anyhow::Result<Self> {
        let static_root = tempfile::tempdir()?;
        std::fs::write(static_root.path().join("site.css"), "body { margin: 0; }")?;

        let mut config = Config::new(environment, "sqlite::memory:");
        config.database.max_connections = 1;
        config.server.static_root = static_root.path().to_path_buf();
        config.identity.session_secret = Some(SESSION_SECRET.to_string());
        customize(&mut config);

        let db = create_pool(config.database.clone()).await?;
        let state = AppState::new(db.clone(), config);

        let outcome = migrate_and_seed(&db, state.sign_in.users()).await;
        anyhow::ensure!(
            matches!(outcome, SeedOutcome::Migrated { seeded: true, .. }),
            "Unexpected seed outcome: {:?}",
            outcome
        );

        let app = build_router(state.clone());

        Ok(TestContext {
            db,
            state,
            app,
            static_root,
        })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Router with extra routes mounted inside the full middleware stack
    pub fn router_with(&self, extra: axum::Router<AppState>) -> axum::Router {
        let routes = app_routes(&self.state.config).merge(extra);
        with_middleware(routes, self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Creates an account with [`PASSWORD`] and returns it
    pub async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        let name = user.user_name.clone();
        let result = self
            .state
            .sign_in
            .users()
            .create(&self.db, user, PASSWORD)
            .await?;
        anyhow::ensure!(result.succeeded(), "Account rejected: {}", result);

        User::find_by_user_name(&self.db, &name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Account {} not found after creation", name))
    }
}

/// Builds the login URI with both parameters form-encoded
pub fn login_uri(username: &str, password: &str) -> String {
    let query = serde_urlencoded::to_string([("username", username), ("password", password)])
        .expect("query parameters encode");
    format!("/api/LoginUser?{}", query)
}

/// Reads a response body to a string
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
