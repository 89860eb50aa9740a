//! sentinel-pipeline library
//!
//! Concurrent sensor pipeline: simulated feeds produce raw records per
//! domain, domain services normalize them and raise alerts, and the
//! orchestrator dispatches each record to a CPU or I/O worker pool. Alerts
//! and latency measurements reach live observers through a broadcast
//! fan-out exposed over HTTP.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod alerting;
pub mod api;
pub mod broadcast;
pub mod channels;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod normalization;
pub mod processing;
pub mod records;
pub mod services;

use broadcast::ObserverRegistry;
use metrics::MetricsCollector;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsCollector>,
    pub observers: Arc<ObserverRegistry>,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsCollector>, observers: Arc<ObserverRegistry>) -> Self {
        Self {
            metrics,
            observers,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/metrics", get(api::get_metrics))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .merge(api::ui_routes())
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
