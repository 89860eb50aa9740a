//! Per-domain normalization
//!
//! A normalizer is a pure function from one [`RawRecord`] to one
//! [`NormalizedRecord`], or a [`ValidationError`] naming the offending field.

pub mod biochemical;
pub mod genetic;
pub mod physical;

pub use biochemical::BiochemicalNormalizer;
pub use genetic::GeneticNormalizer;
pub use physical::PhysicalNormalizer;

use crate::error::ValidationError;
use crate::records::{Domain, NormalizedRecord, RawRecord};
use serde_json::{Map, Value};

/// Validates and normalizes raw records of a single domain
pub trait Normalizer: Send + Sync {
    /// Domain this normalizer accepts
    fn domain(&self) -> Domain;

    /// Validate `raw` and build the typed record
    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError>;
}

/// Field value, treating JSON `null` the same as absence
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// Required string field
fn require_str<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a str, ValidationError> {
    match field(fields, name) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::new(name, "expected a string")),
        None => Err(ValidationError::missing(name)),
    }
}

/// Numeric field accepting JSON numbers and numeric strings
fn coerce_f64(name: &str, value: &Value) -> Result<f64, ValidationError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValidationError::new(name, "expected a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::new(name, "expected a number")),
        _ => Err(ValidationError::new(name, "expected a number")),
    }
}

/// Integer field; whole-valued floats are accepted
fn coerce_i64(name: &str, value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()) {
                Ok(f as i64)
            } else {
                Err(ValidationError::new(name, "expected an integer"))
            }
        }
        _ => Err(ValidationError::new(name, "expected an integer")),
    }
}
