/// HTTPS redirection
///
/// When `Server:HttpsPort` is configured, requests that did not arrive over
/// TLS (per `X-Forwarded-Proto` from the fronting proxy) are redirected with
/// `307 Temporary Redirect` to the same host and path on the HTTPS port.

use crate::app::AppState;
use crate::middleware::security::request_host;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Header set by the TLS-terminating proxy
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn https_redirect_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(https_port) = state.config.server.https_port else {
        return next.run(request).await;
    };

    if is_https(&request) {
        return next.run(request).await;
    }

    let Some(host) = request_host(&request) else {
        return next.run(request).await;
    };

    let location = https_location(host, https_port, &request);
    tracing::debug!(location = %location, "Redirecting to HTTPS");

    Redirect::temporary(&location).into_response()
}

/// Whether the request reached the proxy over TLS
pub(crate) fn is_https(request: &Request) -> bool {
    request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

fn https_location(host: &str, port: u16, request: &Request) -> String {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    if port == 443 {
        format!("https://{}{}", host, path)
    } else {
        format!("https://{}:{}{}", host, port, path)
    }
}
