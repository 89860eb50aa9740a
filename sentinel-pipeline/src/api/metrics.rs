use axum::{extract::State, Json};

use crate::metrics::MetricsSnapshot;
use crate::AppState;

/// GET /api/metrics
///
/// Recomputed from the live accumulators on every request.
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
