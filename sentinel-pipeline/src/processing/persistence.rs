//! Persistence sink
//!
//! The orchestrator hands finished analysis results to
//! [`PersistenceSink::save_result`] on the async runtime, and vitals records
//! to [`PersistenceSink::save_vitals`] on an I/O pool thread because that
//! call blocks.

use crate::error::PersistenceError;
use crate::records::{AnalysisResult, NormalizedRecord};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Destination for analysis results and vitals records
#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store an analysis result (non-blocking)
    async fn save_result(&self, result: &AnalysisResult) -> Result<(), PersistenceError>;

    /// Store a vitals record (blocking; call off the async runtime)
    fn save_vitals(&self, record: &NormalizedRecord) -> Result<(), PersistenceError>;
}

/// Sink that simulates storage latency
///
/// Optionally appends each vitals record as one JSON line to a file.
pub struct SimulatedSink {
    result_delay: Duration,
    vitals_delay: Duration,
    vitals_log: Option<Mutex<std::fs::File>>,
}

impl SimulatedSink {
    pub fn new(result_delay: Duration, vitals_delay: Duration) -> Self {
        Self {
            result_delay,
            vitals_delay,
            vitals_log: None,
        }
    }

    /// Also append vitals to `path` (created if missing)
    pub fn with_vitals_log(mut self, path: PathBuf) -> Result<Self, PersistenceError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Vitals log: {}", path.display());
        self.vitals_log = Some(Mutex::new(file));
        Ok(self)
    }
}

#[async_trait::async_trait]
impl PersistenceSink for SimulatedSink {
    async fn save_result(&self, result: &AnalysisResult) -> Result<(), PersistenceError> {
        debug!(analysis_id = %result.analysis_id, "Saving analysis result");
        tokio::time::sleep(self.result_delay).await;
        debug!(analysis_id = %result.analysis_id, "Analysis result saved");
        Ok(())
    }

    fn save_vitals(&self, record: &NormalizedRecord) -> Result<(), PersistenceError> {
        std::thread::sleep(self.vitals_delay);

        if let Some(log) = &self.vitals_log {
            let mut line = serde_json::to_vec(record)?;
            line.push(b'\n');
            let mut file = log.lock().unwrap_or_else(PoisonError::into_inner);
            file.write_all(&line)?;
        }

        debug!(subject = record.identity().unwrap_or("unknown"), "Vitals saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PhysicalRecord;

    #[test]
    fn test_vitals_appended_as_json_lines() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("vitals.jsonl");
        let sink = SimulatedSink::new(Duration::ZERO, Duration::ZERO)
            .with_vitals_log(path.clone())
            .expect("log file should open");

        for hr in [70, 71] {
            let record = NormalizedRecord::Physical(PhysicalRecord {
                subject_id: "subject_4".to_string(),
                heart_rate: Some(hr),
                spo2: Some(97),
            });
            sink.save_vitals(&record).expect("save should succeed");
        }

        let content = std::fs::read_to_string(&path).expect("log readable");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("valid JSON line");
        assert_eq!(first["type"], "physical");
        assert_eq!(first["heart_rate"], 70);
    }
}
