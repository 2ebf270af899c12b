/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::{app::{build_router, AppState}, config::Config};
/// use gatehouse_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let state = AppState::new(pool, config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        https::https_redirect_layer, panic::PanicResponder, security::SecurityHeadersLayer,
        session::session_layer,
    },
    routes,
};
use axum::{
    routing::{get, post},
    Router,
};
use gatehouse_shared::auth::{sign_in::SignInManager, user_manager::UserManager};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned per request
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Credential checks and session issuing
    pub sign_in: SignInManager,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let users = UserManager::new(config.identity.options());
        let sign_in = SignInManager::new(db.clone(), users, config.identity.session_keys());

        Self {
            db,
            config: Arc::new(config),
            sign_in,
        }
    }
}

/// Builds the router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /                          # Index page
/// ├── GET  /Error                     # Error page
/// ├── GET  /health                    # Health check
/// ├── GET  /api/LoginUser             # Credential check
/// ├── (Development only)
/// │   ├── GET  /dev/migrations
/// │   ├── POST /ApplyDatabaseMigrations
/// │   └── GET  /swagger/v1/swagger.json
/// └── *                               # Static files
/// ```
pub fn build_router(state: AppState) -> Router {
    let router = app_routes(&state.config);
    with_middleware(router, state)
}

/// Routes for the configured environment, static files as fallback
pub fn app_routes(config: &Config) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(routes::pages::index))
        .route("/Error", get(routes::pages::error_page))
        .route("/health", get(routes::health::health_check))
        .route("/api/LoginUser", get(routes::login::login_user));

    if config.environment.is_development() {
        router = router
            .route("/dev/migrations", get(routes::dev::migration_status))
            .route("/ApplyDatabaseMigrations", post(routes::dev::apply_migrations))
            .route("/swagger/v1/swagger.json", get(routes::dev::api_description));
    }

    router.fallback_service(ServeDir::new(&config.server.static_root))
}

/// Wraps routes in the request pipeline and attaches the state
///
/// Middleware, outermost first: tracing, panic handler, security headers,
/// HTTPS redirection, cookie manager, session cookie.
pub fn with_middleware(router: Router<AppState>, state: AppState) -> Router {
    let development = state.config.environment.is_development();

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_layer,
        ))
        .layer(CookieManagerLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            https_redirect_layer,
        ))
        .layer(SecurityHeadersLayer::new(!development))
        .layer(CatchPanicLayer::custom(PanicResponder::new(development)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
