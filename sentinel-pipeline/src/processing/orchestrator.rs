//! Record orchestrator
//!
//! Drains the shared processing channel and dispatches every record as its
//! own task: genetic and biochemical records go to the CPU pool for analysis
//! and then to the persistence sink, physical records go to the I/O pool.
//! Each finished task records its latency and pushes a `latency` event.
//!
//! # Lifecycle
//!
//! `Idle → Running → Draining → Stopped`. On cancellation the orchestrator
//! closes the processing channel and dispatches whatever is still queued in
//! it. It then waits for every dispatched task and shuts down the I/O pool
//! and the CPU pool. Accepted work is never abandoned.

use super::cpu_tasks::{analyze_biochemical, analyze_genetic};
use super::{CpuPool, IoPool, PersistenceSink};
use crate::error::{panic_message, DispatchError, TaskError};
use crate::metrics::{category, MetricsCollector};
use crate::records::{AnalysisResult, Domain, NormalizedRecord};
use futures::FutureExt;
use sentinel_common::{EventPublisher, PipelineEvent};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// CPU-bound analysis kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuAnalysis {
    Genetic,
    Biochemical,
}

impl CpuAnalysis {
    fn run(self, record: NormalizedRecord, work: Duration) -> AnalysisResult {
        match self {
            CpuAnalysis::Genetic => analyze_genetic(record, work),
            CpuAnalysis::Biochemical => analyze_biochemical(record, work),
        }
    }
}

/// Where a record is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Analysis on the CPU pool, result persisted afterwards
    Cpu(CpuAnalysis),
    /// Direct vitals write on the I/O pool
    Io,
}

impl Route {
    pub fn domain(&self) -> Domain {
        match self {
            Route::Cpu(CpuAnalysis::Genetic) => Domain::Genetic,
            Route::Cpu(CpuAnalysis::Biochemical) => Domain::Biochemical,
            Route::Io => Domain::Physical,
        }
    }
}

/// Map a `type` discriminant to its route
pub fn classify(record_type: &str) -> Result<Route, DispatchError> {
    match record_type {
        "genetic" => Ok(Route::Cpu(CpuAnalysis::Genetic)),
        "biochemical" => Ok(Route::Cpu(CpuAnalysis::Biochemical)),
        "physical" => Ok(Route::Io),
        other => Err(DispatchError::UnknownType(other.to_string())),
    }
}

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Simulated CPU time per genetic analysis
    pub genetic_work: Duration,
    /// Simulated CPU time per biochemical analysis
    pub biochemical_work: Duration,
    /// Ceiling on concurrently in-flight dispatch tasks
    pub max_in_flight: usize,
    /// Upper bound on waiting for room in the event channel
    pub event_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            genetic_work: Duration::from_millis(2000),
            biochemical_work: Duration::from_millis(1500),
            max_in_flight: 256,
            event_timeout: Duration::from_secs(1),
        }
    }
}

/// State shared by every dispatch task
struct Dispatcher {
    cpu: CpuPool,
    io: IoPool,
    sink: Arc<dyn PersistenceSink>,
    metrics: Arc<MetricsCollector>,
    events: EventPublisher,
    settings: OrchestratorSettings,
}

impl Dispatcher {
    /// Route and process one record, containing every failure
    async fn handle(&self, record: NormalizedRecord) {
        let route = match classify(record.record_type()) {
            Ok(route) => route,
            Err(e) => {
                error!(record = ?record, "Dropping record: {}", e);
                self.metrics.record_error(category::DISPATCH);
                return;
            }
        };

        let outcome = AssertUnwindSafe(self.execute(route, &record))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));

        if let Err(e) = outcome {
            error!(error = %e, record = ?record, "Task failed");
            self.metrics.record_error(category::PROCESSING);
        }
    }

    async fn execute(&self, route: Route, record: &NormalizedRecord) -> Result<(), TaskError> {
        let start = Instant::now();

        match route {
            Route::Cpu(analysis) => {
                let work = match analysis {
                    CpuAnalysis::Genetic => self.settings.genetic_work,
                    CpuAnalysis::Biochemical => self.settings.biochemical_work,
                };
                let job_record = record.clone();
                let result = self.cpu.run(move || analysis.run(job_record, work)).await?;

                self.finish(route.domain(), start).await;
                self.sink.save_result(&result).await?;
            }
            Route::Io => {
                debug!(subject = record.identity().unwrap_or("unknown"), "Delegating vitals write");
                let sink = Arc::clone(&self.sink);
                let job_record = record.clone();
                self.io.run(move || sink.save_vitals(&job_record)).await??;

                self.finish(route.domain(), start).await;
            }
        }
        Ok(())
    }

    /// Record latency and broadcast it
    async fn finish(&self, domain: Domain, start: Instant) {
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_processing_time(domain.as_str(), elapsed_ms);
        debug!(domain = %domain, "Processing latency: {:.2} ms", elapsed_ms);

        let event = PipelineEvent::Latency {
            label: domain.latency_label(),
            value: elapsed_ms,
        };
        if let Err(e) = self.events.emit_timeout(event, self.settings.event_timeout).await {
            warn!(domain = %domain, "Latency event not delivered: {}", e);
        }
    }
}

/// Consumer of the shared processing channel
pub struct Orchestrator {
    input: mpsc::Receiver<NormalizedRecord>,
    dispatcher: Arc<Dispatcher>,
    in_flight: Arc<Semaphore>,
    tracker: TaskTracker,
    state: watch::Sender<OrchestratorState>,
}

impl Orchestrator {
    /// Take ownership of both pools; nothing else submits to them
    pub fn new(
        input: mpsc::Receiver<NormalizedRecord>,
        cpu: CpuPool,
        io: IoPool,
        sink: Arc<dyn PersistenceSink>,
        metrics: Arc<MetricsCollector>,
        events: EventPublisher,
        settings: OrchestratorSettings,
    ) -> Self {
        let in_flight = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));
        let (state, _) = watch::channel(OrchestratorState::Idle);
        Self {
            input,
            dispatcher: Arc::new(Dispatcher {
                cpu,
                io,
                sink,
                metrics,
                events,
                settings,
            }),
            in_flight,
            tracker: TaskTracker::new(),
            state,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    /// Jobs submitted to the CPU pool so far
    pub fn cpu_jobs_submitted(&self) -> u64 {
        self.dispatcher.cpu.jobs_submitted()
    }

    /// Jobs submitted to the I/O pool so far
    pub fn io_jobs_submitted(&self) -> u64 {
        self.dispatcher.io.jobs_submitted()
    }

    /// Dispatch tasks currently running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Receive and dispatch until cancelled or the channel closes, then drain
    ///
    /// The receive loop never waits for a dispatched task, only for a free
    /// in-flight slot when the ceiling is reached. On cancellation the channel
    /// is closed and records already queued in it are still dispatched.
    pub async fn run(&mut self, cancel: CancellationToken) {
        self.state.send_replace(OrchestratorState::Running);
        info!("Orchestrator started, waiting for records");

        let cancelled = loop {
            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Orchestrator stopping");
                    break true;
                }
                record = self.input.recv() => match record {
                    Some(record) => record,
                    None => {
                        info!("Processing channel closed, orchestrator stopping");
                        break false;
                    }
                },
            };

            if !self.dispatch(record).await {
                break false;
            }
        };

        if cancelled {
            self.input.close();
            let mut drained = 0usize;
            while let Some(record) = self.input.recv().await {
                if !self.dispatch(record).await {
                    break;
                }
                drained += 1;
            }
            if drained > 0 {
                info!(drained, "Dispatched records queued before cancellation");
            }
        }

        self.shutdown().await;
    }

    /// Spawn one dispatch task once an in-flight slot is free
    async fn dispatch(&self, record: NormalizedRecord) -> bool {
        // Never closed, so acquisition only waits for a running task to finish
        let Ok(permit) = Arc::clone(&self.in_flight).acquire_owned().await else {
            error!(record = ?record, "In-flight limiter closed, dropping record");
            self.dispatcher.metrics.record_error(category::PROCESSING);
            return false;
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        self.tracker.spawn(async move {
            let _permit = permit;
            dispatcher.handle(record).await;
        });
        true
    }

    /// Wait for every dispatched task, then both pools
    pub async fn shutdown(&mut self) {
        if self.state() == OrchestratorState::Stopped {
            return;
        }
        self.state.send_replace(OrchestratorState::Draining);
        info!(in_flight = self.tracker.len(), "Draining dispatched tasks");

        self.tracker.close();
        self.tracker.wait().await;

        info!("Shutting down worker pools");
        self.dispatcher.io.shutdown().await;
        self.dispatcher.cpu.shutdown().await;

        self.state.send_replace(OrchestratorState::Stopped);
        info!("Orchestrator shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_types() {
        assert_eq!(classify("genetic"), Ok(Route::Cpu(CpuAnalysis::Genetic)));
        assert_eq!(classify("biochemical"), Ok(Route::Cpu(CpuAnalysis::Biochemical)));
        assert_eq!(classify("physical"), Ok(Route::Io));
    }

    #[test]
    fn test_classify_rejects_everything_else() {
        for record_type in ["", "unknown", "Genetic", "PHYSICAL", "genetic ", "radiological"] {
            assert_eq!(
                classify(record_type),
                Err(DispatchError::UnknownType(record_type.to_string()))
            );
        }
    }

    #[test]
    fn test_every_domain_routes_to_itself() {
        for domain in Domain::ALL {
            let route = classify(domain.as_str()).expect("known domain");
            assert_eq!(route.domain(), domain);
        }
    }
}
