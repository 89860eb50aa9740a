//! Sentinel - Main entry point
//!
//! Wires the channel fabric, domain services, orchestrator, broadcast
//! fan-out and HTTP surface, then runs until Ctrl+C or SIGTERM.
//!
//! Shutdown order:
//! 1. feeds and domain services (cancelled, awaited)
//! 2. orchestrator (drains dispatched tasks, then the I/O and CPU pools)
//! 3. broadcast fan-out (delivers what is still queued)
//! 4. HTTP server (graceful)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sentinel_common::config::TomlConfig;
use sentinel_pipeline::alerting::AlertManager;
use sentinel_pipeline::broadcast::{run_fan_out, ObserverRegistry};
use sentinel_pipeline::channels::ChannelFabric;
use sentinel_pipeline::config::PipelineConfig;
use sentinel_pipeline::ingestion::run_feed;
use sentinel_pipeline::metrics::MetricsCollector;
use sentinel_pipeline::processing::{CpuPool, IoPool, Orchestrator, PersistenceSink, SimulatedSink};
use sentinel_pipeline::records::Domain;
use sentinel_pipeline::services::{BiochemicalService, GeneticService, PhysicalService, ServiceLinks};
use sentinel_pipeline::{build_router, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for sentinel
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(about = "Concurrent sensor ingestion and alerting pipeline")]
#[command(version)]
struct Args {
    /// Path to TOML config file (overrides SENTINEL_CONFIG and default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind address, e.g. 0.0.0.0:8000
    #[arg(short, long, env = "SENTINEL_BIND")]
    bind: Option<String>,

    /// Worker threads in the CPU analysis pool
    #[arg(long, env = "SENTINEL_CPU_WORKERS")]
    cpu_workers: Option<usize>,

    /// Concurrent blocking jobs in the I/O pool
    #[arg(long, env = "SENTINEL_IO_WORKERS")]
    io_workers: Option<usize>,

    /// Simulated feed speed multiplier
    #[arg(long, env = "SENTINEL_SPEED")]
    speed: Option<f64>,

    /// Do not start the simulated feeds
    #[arg(long)]
    no_simulation: bool,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(&self, config: &mut TomlConfig) {
        if let Some(bind) = &self.bind {
            config.http.bind = bind.clone();
        }
        if let Some(cpu_workers) = self.cpu_workers {
            config.pipeline.cpu_workers = cpu_workers;
        }
        if let Some(io_workers) = self.io_workers {
            config.pipeline.io_workers = io_workers;
        }
        if let Some(speed) = self.speed {
            config.simulation.speed = speed;
        }
        if self.no_simulation {
            config.simulation.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut toml_config = TomlConfig::resolve_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut toml_config);

    init_tracing(&toml_config.logging.level);

    info!(
        "Starting sentinel v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = PipelineConfig::from_toml(&toml_config).context("Invalid configuration")?;
    info!(
        cpu_workers = config.cpu_workers,
        io_workers = config.io_workers,
        max_in_flight = config.max_in_flight_dispatch,
        speed = config.simulation_speed,
        "Pipeline configured"
    );

    let metrics = Arc::new(MetricsCollector::new());
    let ChannelFabric {
        genetic,
        biochemical,
        physical,
        processing_tx,
        processing_rx,
        events,
        events_rx,
    } = ChannelFabric::new(
        config.input_channel_capacity,
        config.processing_channel_capacity,
        config.event_channel_capacity,
    );

    // Worker pools and persistence
    let cpu = CpuPool::new(config.cpu_workers).context("Failed to start CPU pool")?;
    let io = IoPool::new(config.io_workers).context("Failed to start I/O pool")?;
    let mut sink = SimulatedSink::new(config.result_save_delay, config.vitals_save_delay);
    if let Some(path) = &config.vitals_log_path {
        sink = sink
            .with_vitals_log(path.clone())
            .context("Failed to open vitals log")?;
    }
    let sink: Arc<dyn PersistenceSink> = Arc::new(sink);

    let alerts = Arc::new(AlertManager::new(
        events.clone(),
        Arc::clone(&metrics),
        config.alerts.clone(),
    ));
    let links = ServiceLinks {
        output: processing_tx,
        alerts,
        metrics: Arc::clone(&metrics),
    };

    let mut orchestrator = Orchestrator::new(
        processing_rx,
        cpu,
        io,
        sink,
        Arc::clone(&metrics),
        events,
        config.orchestrator_settings(),
    );

    let producer_cancel = CancellationToken::new();
    let orchestrator_cancel = CancellationToken::new();
    let fan_out_cancel = CancellationToken::new();
    let server_cancel = CancellationToken::new();

    // Feeds and domain services
    let producers = TaskTracker::new();
    let mut idle_inputs = Vec::new();
    let inputs = [
        (Domain::Genetic, genetic.tx),
        (Domain::Biochemical, biochemical.tx),
        (Domain::Physical, physical.tx),
    ];
    for (domain, tx) in inputs {
        if config.simulation_enabled {
            producers.spawn(run_feed(domain, tx, config.simulation_speed, producer_cancel.clone()));
        } else {
            idle_inputs.push(tx);
        }
    }
    if !config.simulation_enabled {
        info!("Simulated feeds disabled");
    }

    producers.spawn(GeneticService::genetic(genetic.rx, links.clone()).run(producer_cancel.clone()));
    producers.spawn(
        BiochemicalService::biochemical(biochemical.rx, links.clone()).run(producer_cancel.clone()),
    );
    producers.spawn(PhysicalService::physical(physical.rx, links).run(producer_cancel.clone()));
    producers.close();

    // Orchestrator and fan-out
    let orchestrator_task = {
        let cancel = orchestrator_cancel.clone();
        tokio::spawn(async move {
            orchestrator.run(cancel).await;
            orchestrator
        })
    };

    let observers = Arc::new(ObserverRegistry::new(config.observer_buffer));
    let fan_out = tokio::spawn(run_fan_out(
        events_rx,
        Arc::clone(&observers),
        fan_out_cancel.clone(),
    ));

    // HTTP server
    let app = build_router(AppState::new(Arc::clone(&metrics), Arc::clone(&observers)));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("HTTP server listening on {}", config.bind);

    let server = {
        let cancel = server_cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        })
    };

    shutdown_signal().await;
    info!("Beginning ordered shutdown");

    producer_cancel.cancel();
    producers.wait().await;
    drop(idle_inputs);
    info!("Feeds and domain services stopped");

    orchestrator_cancel.cancel();
    let orchestrator = orchestrator_task
        .await
        .context("Orchestrator task failed")?;
    info!(
        cpu_jobs = orchestrator.cpu_jobs_submitted(),
        io_jobs = orchestrator.io_jobs_submitted(),
        "Orchestrator stopped"
    );
    drop(orchestrator);

    fan_out_cancel.cancel();
    fan_out.await.context("Fan-out task failed")?;
    observers.close_all();

    server_cancel.cancel();
    server
        .await
        .context("HTTP server task failed")?
        .context("HTTP server error")?;

    let snapshot = metrics.snapshot();
    info!(
        events = ?snapshot.events_processed,
        errors = ?snapshot.errors_count,
        "Shutdown complete"
    );
    Ok(())
}

/// Initialize tracing; `RUST_LOG` overrides the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sentinel={level},sentinel_pipeline={level},sentinel_common={level},tower_http=warn"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
