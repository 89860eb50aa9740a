//! Record processing: worker pools, analysis jobs, persistence, orchestration

pub mod cpu_pool;
pub mod cpu_tasks;
pub mod io_pool;
pub mod orchestrator;
pub mod persistence;

pub use cpu_pool::CpuPool;
pub use io_pool::IoPool;
pub use orchestrator::{
    classify, CpuAnalysis, Orchestrator, OrchestratorSettings, OrchestratorState, Route,
};
pub use persistence::{PersistenceSink, SimulatedSink};
