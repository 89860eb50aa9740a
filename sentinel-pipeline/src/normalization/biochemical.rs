//! Biochemical sample normalization

use super::{coerce_f64, field, require_str, Normalizer};
use crate::error::ValidationError;
use crate::records::{BiochemicalRecord, Domain, NormalizedRecord, RawRecord};
use serde_json::Value;

/// Normalizer for biochemical analyzer output
///
/// `toxin_level` arrives as `"<float> ppm"`; only the leading
/// whitespace-delimited token is parsed. `protein_x` becomes
/// `protein_x_level`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BiochemicalNormalizer;

impl BiochemicalNormalizer {
    pub fn new() -> Self {
        Self
    }
}

/// Parse the leading number of a `"<float> ppm"` reading
pub fn parse_toxin_level(reading: &str) -> Result<f64, ValidationError> {
    reading
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| ValidationError::new("toxin_level", "invalid toxin_level format"))
}

impl Normalizer for BiochemicalNormalizer {
    fn domain(&self) -> Domain {
        Domain::Biochemical
    }

    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
        let fields = raw.fields();
        let sample_id = require_str(fields, "sample_id")?.to_string();

        let toxin_level = match field(fields, "toxin_level") {
            Some(Value::String(reading)) => parse_toxin_level(reading)?,
            Some(_) => {
                return Err(ValidationError::new(
                    "toxin_level",
                    "invalid toxin_level format",
                ))
            }
            None => return Err(ValidationError::missing("toxin_level")),
        };

        let protein_x_level = match field(fields, "protein_x") {
            Some(value) => coerce_f64("protein_x", value)?,
            None => return Err(ValidationError::missing("protein_x")),
        };

        Ok(NormalizedRecord::Biochemical(BiochemicalRecord {
            sample_id,
            toxin_level,
            protein_x_level,
        }))
    }
}
