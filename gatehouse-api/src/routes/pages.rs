/// Server-rendered pages
///
/// The index page greets the signed-in user, or shows the sign-in banner to
/// anonymous visitors. The error page is what production shows for
/// unhandled failures.

use axum::{response::Html, Extension};
use gatehouse_shared::auth::session::CurrentUser;

const TITLE: &str = "Gatehouse";

pub async fn index(user: Option<Extension<CurrentUser>>) -> Html<String> {
    let banner = match user {
        Some(Extension(user)) => format!(
            r#"<p class="greeting">Hello {}!</p>"#,
            escape_html(&user.user_name)
        ),
        None => r#"<p class="anonymous">You are not signed in. Use <code>/api/LoginUser</code> to sign in.</p>"#
            .to_string(),
    };

    Html(layout(
        "Home page",
        &format!("<h1>Welcome</h1>\n{}", banner),
    ))
}

pub async fn error_page() -> Html<String> {
    Html(render_error_page())
}

pub fn render_error_page() -> String {
    layout(
        "Error",
        r#"<h1 class="text-danger">Error.</h1>
<h2 class="text-danger">An error occurred while processing your request.</h2>"#,
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>{} - {}</title>
<link rel="stylesheet" href="/site.css" />
</head>
<body>
<main>
{}
</main>
</body>
</html>
"#,
        title, TITLE, body
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_greets_user() {
        let user = CurrentUser {
            user_id: "1".to_string(),
            user_name: "test@gmail.com".to_string(),
        };

        let Html(body) = index(Some(Extension(user))).await;
        assert!(body.contains("Hello test@gmail.com!"));
    }

    #[tokio::test]
    async fn test_index_for_anonymous_visitor() {
        let Html(body) = index(None).await;
        assert!(body.contains("not signed in"));
        assert!(!body.contains("Hello"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }
}
