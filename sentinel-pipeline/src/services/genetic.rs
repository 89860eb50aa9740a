use super::{CriticalEventCheck, DomainService, ServiceLinks};
use crate::normalization::genetic::{G_VIRUS, T_VIRUS};
use crate::normalization::GeneticNormalizer;
use crate::records::{NormalizedRecord, RawRecord};
use tokio::sync::mpsc;

/// Critical when either tracked marker was detected
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneticCheck;

impl CriticalEventCheck for GeneticCheck {
    fn service_name(&self) -> &'static str {
        "GeneticService"
    }

    fn check_critical(&self, record: &NormalizedRecord) -> bool {
        match record {
            NormalizedRecord::Genetic(r) => {
                r.detected_mutations.contains(T_VIRUS) || r.detected_mutations.contains(G_VIRUS)
            }
            _ => false,
        }
    }
}

pub type GeneticService = DomainService<GeneticNormalizer, GeneticCheck>;

impl GeneticService {
    pub fn genetic(input: mpsc::Receiver<RawRecord>, links: ServiceLinks) -> Self {
        Self::new(GeneticNormalizer, GeneticCheck, input, links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::GeneticRecord;
    use std::collections::BTreeSet;

    fn record(mutations: &[&str]) -> NormalizedRecord {
        NormalizedRecord::Genetic(GeneticRecord {
            sample_id: "g-1".to_string(),
            sequence: "AC".to_string(),
            detected_mutations: mutations.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
            metadata: None,
        })
    }

    #[test]
    fn test_marker_presence_is_critical() {
        assert!(GeneticCheck.check_critical(&record(&["T-VIRUS"])));
        assert!(GeneticCheck.check_critical(&record(&["G-VIRUS"])));
        assert!(!GeneticCheck.check_critical(&record(&[])));
        assert!(!GeneticCheck.check_critical(&record(&["X-VIRUS"])));
    }
}
