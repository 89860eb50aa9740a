//! Domain services
//!
//! One service per domain, all driven by the generic [`DomainService`] loop:
//! receive raw record → normalize → count → check critical → alert →
//! forward to the shared processing channel. The domain-specific part is the
//! [`CriticalEventCheck`] capability implemented in each submodule.

pub mod biochemical;
pub mod genetic;
pub mod physical;

pub use biochemical::{BiochemicalCheck, BiochemicalService};
pub use genetic::{GeneticCheck, GeneticService};
pub use physical::{PhysicalCheck, PhysicalService};

use crate::alerting::{AlertEvent, AlertManager};
use crate::metrics::{category, MetricsCollector};
use crate::normalization::Normalizer;
use crate::records::{NormalizedRecord, RawRecord};
use sentinel_common::AlertLevel;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Domain-specific critical condition predicate
pub trait CriticalEventCheck: Send + Sync {
    /// Name used in alert text and logs (e.g. `GeneticService`)
    fn service_name(&self) -> &'static str;

    /// Whether a normalized record crosses this domain's safety threshold
    fn check_critical(&self, record: &NormalizedRecord) -> bool;
}

/// Lifecycle of a domain service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

/// What happened to one raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Normalized and placed on the processing channel
    Forwarded,
    /// Failed validation and was dropped
    Rejected,
    /// Normalized, but the processing channel is closed
    DownstreamClosed,
}

/// Handles shared by every domain service
#[derive(Clone)]
pub struct ServiceLinks {
    /// Shared processing channel toward the orchestrator
    pub output: mpsc::Sender<NormalizedRecord>,
    pub alerts: Arc<AlertManager>,
    pub metrics: Arc<MetricsCollector>,
}

/// Generic service runner parameterized over normalizer and critical check
pub struct DomainService<N, C> {
    normalizer: N,
    check: C,
    input: mpsc::Receiver<RawRecord>,
    links: ServiceLinks,
    state: watch::Sender<ServiceState>,
}

impl<N, C> DomainService<N, C>
where
    N: Normalizer,
    C: CriticalEventCheck,
{
    pub fn new(
        normalizer: N,
        check: C,
        input: mpsc::Receiver<RawRecord>,
        links: ServiceLinks,
    ) -> Self {
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            normalizer,
            check,
            input,
            links,
            state,
        }
    }

    pub fn name(&self) -> &'static str {
        self.check.service_name()
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Observe state transitions from outside the task running the service
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Run until cancelled, the input channel closes, or the processing
    /// channel closes
    ///
    /// Cancellation is observed between records; a record already being
    /// processed is finished first.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.state.send_replace(ServiceState::Running);
        info!(service = self.name(), "Service started");

        loop {
            let raw = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(service = self.name(), "Cancellation received");
                    break;
                }
                raw = self.input.recv() => match raw {
                    Some(raw) => raw,
                    None => {
                        debug!(service = self.name(), "Input channel closed");
                        break;
                    }
                },
            };

            if self.process(raw).await == Outcome::DownstreamClosed {
                error!(service = self.name(), "Processing channel closed, stopping service");
                break;
            }
        }

        self.state.send_replace(ServiceState::Stopped);
        info!(service = self.name(), "Service stopped");
    }

    /// Handle one raw record
    ///
    /// The alert, if any, completes before the record is forwarded.
    pub async fn process(&self, raw: RawRecord) -> Outcome {
        let record = match self.normalizer.normalize(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    service = self.name(),
                    field = %e.field,
                    "Validation error: {}", e
                );
                self.links.metrics.record_error(category::VALIDATION);
                return Outcome::Rejected;
            }
        };

        self.links.metrics.record_event(record.record_type());

        if self.check.check_critical(&record) {
            let alert = AlertEvent {
                level: AlertLevel::Critical,
                message: format!("Critical event detected in {}", self.name()),
                triggering_data: record.clone(),
            };
            self.links.alerts.raise(&alert).await;
        }

        match self.links.output.send(record).await {
            Ok(()) => Outcome::Forwarded,
            Err(_) => Outcome::DownstreamClosed,
        }
    }
}
