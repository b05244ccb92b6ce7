//! Landing page handler

use axum::response::Html;

/// Serve the static upload page
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
