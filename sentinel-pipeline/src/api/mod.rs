//! HTTP presentation surface
//!
//! - `GET /health`: liveness and build identification
//! - `GET /api/metrics`: current [`MetricsSnapshot`](crate::metrics::MetricsSnapshot)
//! - `GET /events`: live event stream (Server-Sent Events)
//! - `GET /`: live dashboard page and its script

pub mod events;
pub mod health;
pub mod metrics;
pub mod ui;

pub use events::event_stream;
pub use health::health_routes;
pub use metrics::get_metrics;
pub use ui::ui_routes;

use crate::error::ApiError;
use axum::http::Uri;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
