//! Shared fixtures for sentinel-pipeline integration tests

#![allow(dead_code)]

use sentinel_common::events::EventReceiver;
use sentinel_common::{event_channel, PipelineEvent};
use sentinel_pipeline::alerting::{AlertManager, AlertSettings};
use sentinel_pipeline::error::PersistenceError;
use sentinel_pipeline::metrics::MetricsCollector;
use sentinel_pipeline::processing::{
    CpuPool, IoPool, Orchestrator, OrchestratorSettings, PersistenceSink,
};
use sentinel_pipeline::records::{AnalysisResult, NormalizedRecord};
use sentinel_pipeline::services::ServiceLinks;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Sink that keeps everything it is given
#[derive(Default)]
pub struct RecordingSink {
    pub results: Mutex<Vec<AnalysisResult>>,
    pub vitals: Mutex<Vec<NormalizedRecord>>,
    /// When set, every call fails with this message
    pub fail_with: Option<String>,
    /// When set, every call panics instead of returning
    pub panics: bool,
}

impl RecordingSink {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub fn results(&self) -> Vec<AnalysisResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn vitals(&self) -> Vec<NormalizedRecord> {
        self.vitals.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.panics {
            panic!("sink exploded");
        }
        match &self.fail_with {
            Some(message) => Err(PersistenceError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl PersistenceSink for RecordingSink {
    async fn save_result(&self, result: &AnalysisResult) -> Result<(), PersistenceError> {
        self.check()?;
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn save_vitals(&self, record: &NormalizedRecord) -> Result<(), PersistenceError> {
        self.check()?;
        self.vitals.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Orchestrator settings with near-zero simulated work
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        genetic_work: Duration::from_millis(5),
        biochemical_work: Duration::from_millis(5),
        max_in_flight: 8,
        event_timeout: Duration::from_secs(1),
    }
}

/// Alert settings without the simulated delivery delay
pub fn fast_alerts() -> AlertSettings {
    AlertSettings {
        delivery_delay: Duration::ZERO,
        ..AlertSettings::default()
    }
}

/// An orchestrator wired to in-memory collaborators
pub struct OrchestratorHarness {
    pub tx: mpsc::Sender<NormalizedRecord>,
    pub orchestrator: Orchestrator,
    pub events_rx: EventReceiver,
    pub metrics: Arc<MetricsCollector>,
    pub sink: Arc<RecordingSink>,
}

impl OrchestratorHarness {
    pub fn new(sink: RecordingSink) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let (events, events_rx) = event_channel(64);
        let metrics = Arc::new(MetricsCollector::new());
        let sink = Arc::new(sink);

        let orchestrator = Orchestrator::new(
            rx,
            CpuPool::new(2).expect("CPU pool should start"),
            IoPool::new(2).expect("I/O pool should start"),
            Arc::clone(&sink) as Arc<dyn PersistenceSink>,
            Arc::clone(&metrics),
            events,
            fast_settings(),
        );

        Self {
            tx,
            orchestrator,
            events_rx,
            metrics,
            sink,
        }
    }
}

/// Service links writing into a fresh processing channel
pub struct ServiceHarness {
    pub links: ServiceLinks,
    pub processing_rx: mpsc::Receiver<NormalizedRecord>,
    pub events_rx: EventReceiver,
    pub metrics: Arc<MetricsCollector>,
}

impl ServiceHarness {
    pub fn new() -> Self {
        let (output, processing_rx) = mpsc::channel(16);
        let (events, events_rx) = event_channel(64);
        let metrics = Arc::new(MetricsCollector::new());
        let alerts = Arc::new(AlertManager::new(events, Arc::clone(&metrics), fast_alerts()));

        Self {
            links: ServiceLinks {
                output,
                alerts,
                metrics: Arc::clone(&metrics),
            },
            processing_rx,
            events_rx,
            metrics,
        }
    }
}

/// Everything currently queued on an event receiver
pub fn drain_events(rx: &mut EventReceiver) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
