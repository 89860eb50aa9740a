use super::{CriticalEventCheck, DomainService, ServiceLinks};
use crate::normalization::BiochemicalNormalizer;
use crate::records::{NormalizedRecord, RawRecord};
use tokio::sync::mpsc;

/// Toxin above this level (ppm) is critical
pub const TOXIN_CRITICAL_PPM: f64 = 80.0;
/// Protein X below this level is critical
pub const PROTEIN_X_CRITICAL_MIN: f64 = 5.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct BiochemicalCheck;

impl CriticalEventCheck for BiochemicalCheck {
    fn service_name(&self) -> &'static str {
        "BiochemicalService"
    }

    fn check_critical(&self, record: &NormalizedRecord) -> bool {
        match record {
            NormalizedRecord::Biochemical(r) => {
                r.toxin_level > TOXIN_CRITICAL_PPM || r.protein_x_level < PROTEIN_X_CRITICAL_MIN
            }
            _ => false,
        }
    }
}

pub type BiochemicalService = DomainService<BiochemicalNormalizer, BiochemicalCheck>;

impl BiochemicalService {
    pub fn biochemical(input: mpsc::Receiver<RawRecord>, links: ServiceLinks) -> Self {
        Self::new(BiochemicalNormalizer, BiochemicalCheck, input, links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BiochemicalRecord;

    fn record(toxin_level: f64, protein_x_level: f64) -> NormalizedRecord {
        NormalizedRecord::Biochemical(BiochemicalRecord {
            sample_id: "bio_1000".to_string(),
            toxin_level,
            protein_x_level,
        })
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert!(BiochemicalCheck.check_critical(&record(85.5, 10.1)));
        assert!(BiochemicalCheck.check_critical(&record(20.0, 4.9)));
        assert!(!BiochemicalCheck.check_critical(&record(80.0, 5.0)));
        assert!(!BiochemicalCheck.check_critical(&record(42.0, 12.0)));
    }
}
