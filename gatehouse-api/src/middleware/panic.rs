/// Exception handler for panicking request handlers
///
/// Development answers with the panic message as plain text; every other
/// environment renders the generic error page. Both use status 500.

use crate::routes::pages::render_error_page;
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};
use std::any::Any;
use tower_http::catch_panic::ResponseForPanic;

#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    development: bool,
}

impl PanicResponder {
    pub fn new(development: bool) -> Self {
        Self { development }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());
        tracing::error!(panic = %message, "Request handler panicked");

        let (content_type, body) = if self.development {
            ("text/plain; charset=utf-8", format!("Unhandled panic: {}", message))
        } else {
            ("text/html; charset=utf-8", render_error_page())
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
