//! Record types flowing through the pipeline
//!
//! - [`RawRecord`]: loosely-structured generator output, tagged with its domain
//! - [`NormalizedRecord`]: validated record in one of three closed schemas
//! - [`AnalysisResult`]: output of a CPU analysis, handed to persistence

use sentinel_common::LatencyLabel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Data category a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Genetic,
    Biochemical,
    Physical,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Genetic, Domain::Biochemical, Domain::Physical];

    /// Discriminant string carried by normalized records
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Genetic => "genetic",
            Domain::Biochemical => "biochemical",
            Domain::Physical => "physical",
        }
    }

    /// Parse a `type` discriminant; `None` for anything unrecognized
    pub fn from_type(record_type: &str) -> Option<Self> {
        match record_type {
            "genetic" => Some(Domain::Genetic),
            "biochemical" => Some(Domain::Biochemical),
            "physical" => Some(Domain::Physical),
            _ => None,
        }
    }

    /// Label used for latency broadcasts
    pub fn latency_label(&self) -> LatencyLabel {
        match self {
            Domain::Genetic => LatencyLabel::Genetic,
            Domain::Biochemical => LatencyLabel::Biochemical,
            Domain::Physical => LatencyLabel::Physical,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw generator output: a map of field name to dynamic value
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    domain: Domain,
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(domain: Domain, fields: Map<String, Value>) -> Self {
        Self { domain, fields }
    }

    /// Build from a JSON value; anything other than an object yields no fields
    pub fn from_json(domain: Domain, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { domain, fields }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Validated genetic sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticRecord {
    pub sample_id: String,
    /// Trimmed, uppercased, whitespace-free sequence
    pub sequence: String,
    pub detected_mutations: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Validated biochemical sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiochemicalRecord {
    pub sample_id: String,
    /// Parts per million
    pub toxin_level: f64,
    pub protein_x_level: f64,
}

/// Validated physical vitals reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRecord {
    pub subject_id: String,
    pub heart_rate: Option<i64>,
    pub spo2: Option<i64>,
}

/// A record that passed normalization
///
/// The serialized form carries a `type` discriminant (`"genetic"`,
/// `"biochemical"`, `"physical"`) that the orchestrator routes on. Records are
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NormalizedRecord {
    Genetic(GeneticRecord),
    Biochemical(BiochemicalRecord),
    Physical(PhysicalRecord),
}

impl NormalizedRecord {
    pub fn domain(&self) -> Domain {
        match self {
            NormalizedRecord::Genetic(_) => Domain::Genetic,
            NormalizedRecord::Biochemical(_) => Domain::Biochemical,
            NormalizedRecord::Physical(_) => Domain::Physical,
        }
    }

    /// The `type` discriminant
    pub fn record_type(&self) -> &'static str {
        self.domain().as_str()
    }

    /// `sample_id` for lab samples, `subject_id` for vitals
    pub fn identity(&self) -> Option<&str> {
        match self {
            NormalizedRecord::Genetic(r) => Some(r.sample_id.as_str()),
            NormalizedRecord::Biochemical(r) => Some(r.sample_id.as_str()),
            NormalizedRecord::Physical(r) => Some(r.subject_id.as_str()),
        }
    }
}

/// Output of a CPU analysis task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub source_data: NormalizedRecord,
    pub finding: String,
    pub analysis_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_domain_round_trip_through_type_string() {
        for domain in Domain::ALL {
            assert_eq!(Domain::from_type(domain.as_str()), Some(domain));
        }
        assert_eq!(Domain::from_type("radiological"), None);
        assert_eq!(Domain::from_type("Genetic"), None);
    }

    #[test]
    fn test_normalized_record_serializes_type_discriminant() {
        let record = NormalizedRecord::Physical(PhysicalRecord {
            subject_id: "s-01".to_string(),
            heart_rate: Some(75),
            spo2: None,
        });

        let value = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(value["type"], "physical");
        assert_eq!(value["subject_id"], "s-01");
        assert_eq!(value["heart_rate"], 75);
        assert!(value["spo2"].is_null());
        assert_eq!(record.record_type(), "physical");
        assert_eq!(record.identity(), Some("s-01"));
    }

    #[test]
    fn test_raw_record_from_non_object_has_no_fields() {
        let raw = RawRecord::from_json(Domain::Genetic, json!(["not", "an", "object"]));
        assert!(raw.fields().is_empty());
        assert_eq!(raw.domain(), Domain::Genetic);
    }
}
