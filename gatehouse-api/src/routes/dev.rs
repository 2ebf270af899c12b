/// Development diagnostics
///
/// Only mounted when the environment is `Development`:
///
/// - `GET /dev/migrations` - applied and pending migrations
/// - `POST /ApplyDatabaseMigrations` - applies pending migrations
/// - `GET /swagger/v1/swagger.json` - API description document

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use gatehouse_shared::db::migrations::{get_migration_status, run_migrations, MigrationStatus};
use serde_json::{json, Value};

pub async fn migration_status(State(state): State<AppState>) -> ApiResult<Json<MigrationStatus>> {
    let status = get_migration_status(&state.db)
        .await
        .map_err(|e| ApiError::InternalError(format!("Migration status failed: {}", e)))?;

    Ok(Json(status))
}

pub async fn apply_migrations(State(state): State<AppState>) -> ApiResult<StatusCode> {
    let applied = run_migrations(&state.db)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(applied = applied.len(), "Migrations applied on request");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_description() -> Json<Value> {
    Json(json!({
        "openapi": "3.0.1",
        "info": {
            "title": "Gatehouse",
            "version": "v1"
        },
        "paths": {
            "/api/LoginUser": {
                "get": {
                    "parameters": [
                        {
                            "name": "username",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string" }
                        },
                        {
                            "name": "password",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string" }
                        }
                    ],
                    "responses": {
                        "200": { "description": "Signed in; the session cookie is set" },
                        "400": {
                            "description": "Sign-in refused",
                            "content": {
                                "application/json": {
                                    "schema": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }))
}
