//! # Gatehouse Web Server
//!
//! Serves the identity-backed site: the credential check endpoint, pages,
//! static files and, in development, the migration diagnostics.
//!
//! Startup applies pending migrations and seeds the test account before the
//! listener opens; a failure there is logged and the server starts anyway.
//!
//! ## Usage
//!
//! ```bash
//! ConnectionStrings__DefaultConnection=sqlite:gatehouse.db cargo run -p gatehouse-api
//! ```

use gatehouse_api::{
    app::{build_router, AppState},
    config::Config,
};
use gatehouse_shared::db::{
    pool::{close_pool, create_pool},
    seed::migrate_and_seed,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gatehouse_api=debug,gatehouse_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        environment = %config.environment,
        "Gatehouse v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(config.database.clone()).await?;
    let state = AppState::new(pool.clone(), config.clone());

    migrate_and_seed(&pool, state.sign_in.users()).await;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
