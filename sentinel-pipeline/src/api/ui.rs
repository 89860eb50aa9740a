//! Live dashboard
//!
//! A single static page that subscribes to `/events` and polls
//! `/api/metrics`. Assets are compiled into the binary.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

const INDEX_HTML: &str = include_str!("../ui/index.html");
const DASHBOARD_JS: &str = include_str!("../ui/dashboard.js");

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/dashboard.js
pub async fn serve_dashboard_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        DASHBOARD_JS,
    )
        .into_response()
}

/// Build dashboard routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_index))
        .route("/static/dashboard.js", get(serve_dashboard_js))
}
