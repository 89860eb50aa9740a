//! Physical vitals normalization

use super::{coerce_i64, field, Normalizer};
use crate::error::ValidationError;
use crate::records::{Domain, NormalizedRecord, PhysicalRecord, RawRecord};
use serde_json::{Map, Value};

/// Normalizer for wearable vitals
///
/// Reads nested `vitals.heart_rate` and `vitals.spo2`. SpO2 may arrive as
/// `"98%"` or as a number. Absent vitals become `None`, never an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicalNormalizer;

impl PhysicalNormalizer {
    pub fn new() -> Self {
        Self
    }
}

/// Parse an SpO2 reading given as `"<int>%"` or a number
pub fn parse_spo2(value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::String(s) => s
            .replace('%', "")
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::new("spo2", "invalid spo2 format")),
        // Numeric readings truncate toward zero
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .ok_or_else(|| ValidationError::new("spo2", "invalid spo2 format")),
        _ => Err(ValidationError::new("spo2", "invalid spo2 format")),
    }
}

impl Normalizer for PhysicalNormalizer {
    fn domain(&self) -> Domain {
        Domain::Physical
    }

    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
        let fields = raw.fields();

        let subject_id = match field(fields, "subject_id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None => {
                return Err(ValidationError::new("subject_id", "missing subject_id"))
            }
            Some(_) => return Err(ValidationError::new("subject_id", "expected a string")),
        };

        let empty = Map::new();
        let vitals = match field(fields, "vitals") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ValidationError::new("vitals", "expected an object")),
            None => &empty,
        };

        let heart_rate = field(vitals, "heart_rate")
            .map(|v| coerce_i64("heart_rate", v))
            .transpose()?;
        let spo2 = field(vitals, "spo2").map(parse_spo2).transpose()?;

        Ok(NormalizedRecord::Physical(PhysicalRecord {
            subject_id,
            heart_rate,
            spo2,
        }))
    }
}
