use super::{CriticalEventCheck, DomainService, ServiceLinks};
use crate::normalization::PhysicalNormalizer;
use crate::records::{NormalizedRecord, PhysicalRecord, RawRecord};
use tokio::sync::mpsc;

pub const HEART_RATE_MAX: i64 = 190;
pub const HEART_RATE_MIN: i64 = 40;
pub const SPO2_MIN: i64 = 90;

#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicalCheck;

/// Abnormal heart rate (including cardiac arrest) or low oxygen saturation
pub fn vitals_critical(record: &PhysicalRecord) -> bool {
    let heart_rate_critical = record
        .heart_rate
        .is_some_and(|hr| hr == 0 || hr > HEART_RATE_MAX || hr < HEART_RATE_MIN);
    let spo2_critical = record.spo2.is_some_and(|spo2| spo2 < SPO2_MIN);
    heart_rate_critical || spo2_critical
}

impl CriticalEventCheck for PhysicalCheck {
    fn service_name(&self) -> &'static str {
        "PhysicalService"
    }

    fn check_critical(&self, record: &NormalizedRecord) -> bool {
        match record {
            NormalizedRecord::Physical(r) => vitals_critical(r),
            _ => false,
        }
    }
}

pub type PhysicalService = DomainService<PhysicalNormalizer, PhysicalCheck>;

impl PhysicalService {
    pub fn physical(input: mpsc::Receiver<RawRecord>, links: ServiceLinks) -> Self {
        Self::new(PhysicalNormalizer, PhysicalCheck, input, links)
    }
}
