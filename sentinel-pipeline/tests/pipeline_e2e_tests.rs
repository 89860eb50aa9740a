//! End-to-end pipeline tests
//!
//! Wires the channel fabric, domain services, orchestrator and broadcast
//! fan-out the same way the binary does, then feeds hand-written raw
//! records and watches what an observer receives.

mod helpers;

use helpers::{fast_alerts, fast_settings, RecordingSink};
use sentinel_pipeline::alerting::AlertManager;
use sentinel_pipeline::broadcast::{run_fan_out, Observer, ObserverRegistry};
use sentinel_pipeline::channels::ChannelFabric;
use sentinel_pipeline::metrics::MetricsCollector;
use sentinel_pipeline::processing::{CpuPool, IoPool, Orchestrator, PersistenceSink};
use sentinel_pipeline::records::{Domain, RawRecord};
use sentinel_pipeline::services::{
    BiochemicalService, GeneticService, PhysicalService, ServiceLinks,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A running pipeline without simulated feeds
struct Pipeline {
    genetic: mpsc::Sender<RawRecord>,
    biochemical: mpsc::Sender<RawRecord>,
    physical: mpsc::Sender<RawRecord>,
    observer: Observer,
    metrics: Arc<MetricsCollector>,
    sink: Arc<RecordingSink>,
    services: TaskTracker,
    orchestrator: tokio::task::JoinHandle<Orchestrator>,
    fan_out: tokio::task::JoinHandle<()>,
}

impl Pipeline {
    fn start() -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let fabric = ChannelFabric::new(8, 8, 64);
        let sink = Arc::new(RecordingSink::default());

        let alerts = Arc::new(AlertManager::new(
            fabric.events.clone(),
            Arc::clone(&metrics),
            fast_alerts(),
        ));
        let links = ServiceLinks {
            output: fabric.processing_tx,
            alerts,
            metrics: Arc::clone(&metrics),
        };

        let cancel = CancellationToken::new();
        let services = TaskTracker::new();
        services.spawn(GeneticService::genetic(fabric.genetic.rx, links.clone()).run(cancel.clone()));
        services.spawn(
            BiochemicalService::biochemical(fabric.biochemical.rx, links.clone())
                .run(cancel.clone()),
        );
        services.spawn(PhysicalService::physical(fabric.physical.rx, links).run(cancel));
        services.close();

        let mut orchestrator = Orchestrator::new(
            fabric.processing_rx,
            CpuPool::new(2).expect("CPU pool should start"),
            IoPool::new(2).expect("I/O pool should start"),
            Arc::clone(&sink) as Arc<dyn PersistenceSink>,
            Arc::clone(&metrics),
            fabric.events,
            fast_settings(),
        );
        let orchestrator = tokio::spawn(async move {
            orchestrator.run(CancellationToken::new()).await;
            orchestrator
        });

        let observers = Arc::new(ObserverRegistry::new(64));
        let observer = observers.register();
        let fan_out = tokio::spawn(run_fan_out(
            fabric.events_rx,
            observers,
            CancellationToken::new(),
        ));

        Self {
            genetic: fabric.genetic.tx,
            biochemical: fabric.biochemical.tx,
            physical: fabric.physical.tx,
            observer,
            metrics,
            sink,
            services,
            orchestrator,
            fan_out,
        }
    }

    /// Close every input and wait for the pipeline to drain
    async fn finish(self) -> Report {
        let Pipeline {
            genetic,
            biochemical,
            physical,
            mut observer,
            metrics,
            sink,
            services,
            orchestrator,
            fan_out,
        } = self;
        drop((genetic, biochemical, physical));

        let drained = async {
            services.wait().await;
            let orchestrator = orchestrator.await.expect("orchestrator task should not panic");
            let jobs = (orchestrator.cpu_jobs_submitted(), orchestrator.io_jobs_submitted());
            // Last event publisher goes away with the orchestrator
            drop(orchestrator);
            fan_out.await.expect("fan-out task should not panic");
            jobs
        };
        let (cpu_jobs, io_jobs) = tokio::time::timeout(Duration::from_secs(10), drained)
            .await
            .expect("pipeline should drain in time");

        let mut received = Vec::new();
        while let Ok(message) = observer.rx.try_recv() {
            received.push(serde_json::from_str(&message.data).expect("event should be JSON"));
        }

        Report {
            cpu_jobs,
            io_jobs,
            received,
            metrics,
            sink,
        }
    }
}

/// What a drained pipeline left behind
struct Report {
    cpu_jobs: u64,
    io_jobs: u64,
    received: Vec<Value>,
    metrics: Arc<MetricsCollector>,
    sink: Arc<RecordingSink>,
}

async fn send(tx: &mpsc::Sender<RawRecord>, domain: Domain, value: Value) {
    tx.send(RawRecord::from_json(domain, value))
        .await
        .expect("service should accept input");
}

// ============================================================================
// Scenarios
// ============================================================================

/// **Given:** a running pipeline
/// **When:** one normal vitals reading is fed
/// **Then:** it is counted, written via the I/O pool, and only a latency event reaches observers
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_normal_vitals_flow_through_io_pool() {
    let pipeline = Pipeline::start();
    send(
        &pipeline.physical,
        Domain::Physical,
        json!({"subject_id": "s-01", "vitals": {"heart_rate": 75, "spo2": "98%"}}),
    )
    .await;

    let Report {
        cpu_jobs,
        io_jobs,
        received,
        metrics,
        sink,
    } = pipeline.finish().await;

    assert_eq!(io_jobs, 1);
    assert_eq!(cpu_jobs, 0);
    assert_eq!(sink.vitals().len(), 1);
    assert!(sink.results().is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.events_processed["physical"], 1);
    assert_eq!(snapshot.events_processed["total"], 1);
    assert_eq!(snapshot.errors_count["total"], 0);

    assert_eq!(received.len(), 1, "received: {received:?}");
    assert_eq!(received[0]["type"], "latency");
    assert_eq!(received[0]["label"], "Physical");
    assert!(received[0]["value"].as_f64().is_some());
}

/// **Given:** a running pipeline
/// **When:** a critical genetic sample and an invalid biochemical sample are fed
/// **Then:** the alert precedes the sample's latency event and the bad sample is counted as a validation error
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_critical_and_invalid_samples() {
    let pipeline = Pipeline::start();
    send(
        &pipeline.genetic,
        Domain::Genetic,
        json!({"sample_id": "g-124", "raw_sequence": " atcg GTC "}),
    )
    .await;
    send(
        &pipeline.biochemical,
        Domain::Biochemical,
        json!({"sample_id": "b-9", "toxin_level": "alto", "protein_x": 3.0}),
    )
    .await;

    let Report {
        cpu_jobs,
        received,
        metrics,
        sink,
        ..
    } = pipeline.finish().await;

    assert_eq!(cpu_jobs, 1);
    assert_eq!(sink.results().len(), 1);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.events_processed["genetic"], 1);
    assert_eq!(snapshot.events_processed["biochemical"], 0);
    assert_eq!(snapshot.errors_count["validation"], 1);
    assert!(snapshot.average_alert_latency_ms >= 0.0);

    let types: Vec<&str> = received
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(types, vec!["alert", "latency"]);
    assert_eq!(received[0]["level"], "CRITICAL");
    assert_eq!(received[0]["message"], "Critical event detected in GeneticService");
    assert_eq!(received[1]["label"], "Genetic");
}
