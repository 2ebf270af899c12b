/// Credential check endpoint
///
/// ```text
/// GET /api/LoginUser?username=test@gmail.com&password=!TestPassword123
/// ```
///
/// A successful sign-in answers `200 OK` with an empty body and sets the
/// session cookie. Any other outcome answers `400 Bad Request` with a JSON
/// string naming the result, e.g. `"SignInResult: Failed"`.
///
/// Missing or empty parameters are rejected with a `400` error body before
/// any credential check happens.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::session_cookie,
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tower_cookies::Cookies;
use validator::Validate;

/// Query parameters of the login endpoint
#[derive(Debug, Deserialize, Validate)]
pub struct LoginQuery {
    #[validate(length(min = 1, message = "The username field is required."))]
    pub username: String,

    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

pub async fn login_user(
    State(state): State<AppState>,
    cookies: Cookies,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    query.validate()?;

    let outcome = state
        .sign_in
        .password_sign_in(&query.username, &query.password, false, false)
        .await?;

    match outcome.session_token {
        Some(token) if outcome.result.succeeded() => {
            cookies.add(session_cookie(token, outcome.is_persistent));
            Ok(StatusCode::OK.into_response())
        }
        _ => Ok((
            StatusCode::BAD_REQUEST,
            Json(format!("SignInResult: {}", outcome.result)),
        )
            .into_response()),
    }
}
