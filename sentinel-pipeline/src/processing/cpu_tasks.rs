//! CPU-bound analysis jobs
//!
//! These run on [`CpuPool`](super::CpuPool) threads. The "analysis" is a
//! busy loop of configurable length standing in for real computation.

use crate::records::{AnalysisResult, NormalizedRecord};
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Finding reported when a genetic sequence carries the T marker
pub const FINDING_T_VIRUS: &str = "T-virus mutation detected";
pub const FINDING_STABLE: &str = "Stable";
pub const FINDING_UNSTABLE_TOXIN: &str = "Unstable toxin levels";

/// Keep the current thread busy for `duration`
fn burn_cpu(duration: Duration) {
    let start = Instant::now();
    let mut acc: u64 = 0;
    while start.elapsed() < duration {
        acc = black_box(acc.wrapping_add(1));
    }
}

fn analysis_id(record: &NormalizedRecord) -> String {
    format!("res_{}", record.identity().unwrap_or("unknown"))
}

/// Simulated sequence analysis
pub fn analyze_genetic(record: NormalizedRecord, work: Duration) -> AnalysisResult {
    burn_cpu(work);

    let mutated = match &record {
        NormalizedRecord::Genetic(r) => r.sequence.contains('T'),
        _ => false,
    };

    AnalysisResult {
        analysis_id: analysis_id(&record),
        finding: if mutated { FINDING_T_VIRUS } else { FINDING_STABLE }.to_string(),
        analysis_type: "genetic".to_string(),
        source_data: record,
    }
}

/// Simulated toxin model
pub fn analyze_biochemical(record: NormalizedRecord, work: Duration) -> AnalysisResult {
    burn_cpu(work);

    AnalysisResult {
        analysis_id: analysis_id(&record),
        finding: FINDING_UNSTABLE_TOXIN.to_string(),
        analysis_type: "biochemical".to_string(),
        source_data: record,
    }
}
