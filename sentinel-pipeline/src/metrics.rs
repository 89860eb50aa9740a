//! Process-wide pipeline metrics
//!
//! Constructed once in `main` and shared by `Arc` with every component.
//! State is split into four independently locked sections (events, errors,
//! processing latency, alert latency) so writers to different sections
//! never contend. [`MetricsCollector::snapshot`] takes all four in the fixed
//! order of the field declarations.

use crate::records::Domain;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Error categories counted by the pipeline
pub mod category {
    pub const VALIDATION: &str = "validation";
    pub const PROCESSING: &str = "processing";
    pub const ALERTING: &str = "alerting";
    pub const DISPATCH: &str = "dispatch";

    pub const ALL: [&str; 4] = [VALIDATION, PROCESSING, ALERTING, DISPATCH];
}

/// Key under which the grand total is reported
pub const TOTAL: &str = "total";

/// Total plus per-key counts over a fixed key set
#[derive(Debug)]
struct Counters {
    total: u64,
    by_key: HashMap<&'static str, u64>,
}

impl Counters {
    fn new(keys: &[&'static str]) -> Self {
        Self {
            total: 0,
            by_key: keys.iter().map(|k| (*k, 0)).collect(),
        }
    }

    /// Unknown keys bump the total only
    fn increment(&mut self, key: &str) {
        self.total += 1;
        if let Some(count) = self.by_key.get_mut(key) {
            *count += 1;
        }
    }

    fn to_map(&self) -> BTreeMap<String, u64> {
        let mut map: BTreeMap<String, u64> = self
            .by_key
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        map.insert(TOTAL.to_string(), self.total);
        map
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Point-in-time copy of all counters and averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Per-domain counts plus `total`
    pub events_processed: BTreeMap<String, u64>,
    /// Per-category counts plus `total`
    pub errors_count: BTreeMap<String, u64>,
    /// Mean processing latency per domain, milliseconds
    pub average_processing_latency_ms: BTreeMap<String, f64>,
    /// Mean alert latency, milliseconds
    pub average_alert_latency_ms: f64,
}

/// Thread-safe metrics accumulators
#[derive(Debug)]
pub struct MetricsCollector {
    events: Mutex<Counters>,
    errors: Mutex<Counters>,
    processing_latency: Mutex<HashMap<Domain, Accumulator>>,
    alert_latency: Mutex<Accumulator>,
}

/// Lock, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let domains: Vec<&'static str> = Domain::ALL.iter().map(Domain::as_str).collect();
        Self {
            events: Mutex::new(Counters::new(&domains)),
            errors: Mutex::new(Counters::new(&category::ALL)),
            processing_latency: Mutex::new(
                Domain::ALL
                    .iter()
                    .map(|d| (*d, Accumulator::default()))
                    .collect(),
            ),
            alert_latency: Mutex::new(Accumulator::default()),
        }
    }

    /// Count one processed record of `record_type`
    pub fn record_event(&self, record_type: &str) {
        lock(&self.events).increment(record_type);
    }

    /// Count one error in `category`
    pub fn record_error(&self, category: &str) {
        lock(&self.errors).increment(category);
    }

    /// Accumulate a processing latency sample for `record_type`
    ///
    /// Samples for unknown types are discarded.
    pub fn record_processing_time(&self, record_type: &str, elapsed_ms: f64) {
        let Some(domain) = Domain::from_type(record_type) else {
            return;
        };
        lock(&self.processing_latency)
            .entry(domain)
            .or_default()
            .add(elapsed_ms);
    }

    /// Accumulate the time elapsed since `start` as an alert latency sample
    pub fn record_alert_latency(&self, start: Instant) {
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        lock(&self.alert_latency).add(elapsed_ms);
    }

    /// Number of alert latency samples recorded so far
    pub fn alert_latency_count(&self) -> u64 {
        lock(&self.alert_latency).count
    }

    /// Copy every counter and compute averages
    pub fn snapshot(&self) -> MetricsSnapshot {
        let events = lock(&self.events);
        let errors = lock(&self.errors);
        let processing = lock(&self.processing_latency);
        let alerts = lock(&self.alert_latency);

        MetricsSnapshot {
            events_processed: events.to_map(),
            errors_count: errors.to_map(),
            average_processing_latency_ms: processing
                .iter()
                .map(|(domain, acc)| (domain.as_str().to_string(), acc.average()))
                .collect(),
            average_alert_latency_ms: alerts.average(),
        }
    }
}
