/// Session cookie authentication
///
/// Sign-in hands the session token to [`session_cookie`], which the login
/// handler adds to the response through `tower-cookies`. On later requests
/// [`session_layer`] resolves the cookie into a [`CurrentUser`] request
/// extension. Requests without a cookie, or with one that fails validation,
/// continue anonymously.
///
/// Both rely on `CookieManagerLayer` wrapping the router.

use crate::app::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use gatehouse_shared::auth::session::{
    session_lifetime, validate_token, CurrentUser, SessionKeys, SESSION_COOKIE_NAME,
};
use tower_cookies::{
    cookie::{time::Duration, SameSite},
    Cookie, Cookies,
};

pub async fn session_layer(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = cookies.get(SESSION_COOKIE_NAME);

    if let Some(user) = current_user(cookie.as_ref(), state.sign_in.keys()) {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

/// Builds the session cookie for a signed-in user
///
/// A non-persistent sign-in yields a browser-session cookie; a persistent one
/// lives as long as the token.
pub fn session_cookie(token: String, is_persistent: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    if is_persistent {
        cookie = cookie.max_age(Duration::seconds(session_lifetime().num_seconds()));
    }

    cookie.build()
}

fn current_user(cookie: Option<&Cookie<'_>>, keys: &SessionKeys) -> Option<CurrentUser> {
    let token = cookie?.value_trimmed();
    if token.is_empty() {
        return None;
    }

    match validate_token(token, keys) {
        Ok(claims) => Some(claims.into()),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring session cookie");
            None
        }
    }
}
