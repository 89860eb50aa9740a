//! Genetic sample normalization

use super::{field, require_str, Normalizer};
use crate::error::ValidationError;
use crate::records::{Domain, GeneticRecord, NormalizedRecord, RawRecord};
use serde_json::Value;
use std::collections::BTreeSet;

/// Marker reported when the sequence contains a `T`
pub const T_VIRUS: &str = "T-VIRUS";
/// Marker reported when the sequence contains a `G`
pub const G_VIRUS: &str = "G-VIRUS";

/// Normalizer for genetic sequencer output
///
/// Accepts `sample_id` plus either `raw_sequence` or an already prepared
/// `sequence`. The mutation scan is a single-character substring check
/// (`T` → T-VIRUS, `G` → G-VIRUS), not motif matching.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneticNormalizer;

impl GeneticNormalizer {
    pub fn new() -> Self {
        Self
    }
}

/// Strip all whitespace and uppercase
pub fn clean_sequence(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

impl Normalizer for GeneticNormalizer {
    fn domain(&self) -> Domain {
        Domain::Genetic
    }

    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
        let fields = raw.fields();
        let sample_id = require_str(fields, "sample_id")?.to_string();

        let sequence = match field(fields, "raw_sequence") {
            Some(Value::String(s)) => clean_sequence(s),
            Some(_) => return Err(ValidationError::new("raw_sequence", "expected a string")),
            None => match field(fields, "sequence") {
                Some(Value::String(s)) => clean_sequence(s),
                Some(_) => return Err(ValidationError::new("sequence", "expected a string")),
                None => return Err(ValidationError::missing("raw_sequence")),
            },
        };

        let mut detected_mutations = match field(fields, "detected_mutations") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ValidationError::new("detected_mutations", "expected a list of strings")
                    })
                })
                .collect::<Result<BTreeSet<_>, _>>()?,
            Some(_) => {
                return Err(ValidationError::new(
                    "detected_mutations",
                    "expected a list of strings",
                ))
            }
            None => BTreeSet::new(),
        };

        if sequence.contains('T') {
            detected_mutations.insert(T_VIRUS.to_string());
        }
        if sequence.contains('G') {
            detected_mutations.insert(G_VIRUS.to_string());
        }

        let metadata = match field(fields, "metadata") {
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => return Err(ValidationError::new("metadata", "expected an object")),
            None => None,
        };

        Ok(NormalizedRecord::Genetic(GeneticRecord {
            sample_id,
            sequence,
            detected_mutations,
            metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<GeneticRecord, ValidationError> {
        match GeneticNormalizer.normalize(&RawRecord::from_json(Domain::Genetic, value))? {
            NormalizedRecord::Genetic(record) => Ok(record),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_sequence_is_cleaned_and_scanned() {
        let record = normalize(json!({"sample_id": "g-123", "raw_sequence": " atcg GTC "}))
            .expect("valid genetic record");

        assert_eq!(record.sample_id, "g-123");
        assert_eq!(record.sequence, "ATCGGTC");
        assert!(record.detected_mutations.contains(G_VIRUS));
        assert!(record.detected_mutations.contains(T_VIRUS));
    }

    #[test]
    fn test_sequence_without_markers_has_no_mutations() {
        let record = normalize(json!({"sample_id": "g-200", "raw_sequence": "aac ca"}))
            .expect("valid genetic record");
        assert_eq!(record.sequence, "AACCA");
        assert!(record.detected_mutations.is_empty());
    }

    #[test]
    fn test_interior_tabs_and_newlines_removed() {
        let record = normalize(json!({"sample_id": "g-201", "raw_sequence": "ac\tca\nac"}))
            .expect("valid genetic record");
        assert_eq!(record.sequence, "ACCAAC");
    }

    #[test]
    fn test_preset_sequence_accepted() {
        let record = normalize(json!({"sample_id": "g-202", "sequence": "ccgc"}))
            .expect("preset sequence should be accepted");
        assert_eq!(record.sequence, "CCGC");
        assert!(record.detected_mutations.contains(G_VIRUS));
    }

    #[test]
    fn test_metadata_carried_through() {
        let record = normalize(json!({
            "sample_id": "g-203",
            "raw_sequence": "ac",
            "metadata": {"source_lab": "Lab-01"}
        }))
        .expect("valid genetic record");

        let metadata = record.metadata.expect("metadata should be kept");
        assert_eq!(metadata["source_lab"], "Lab-01");
    }

    #[test]
    fn test_missing_sample_id_rejected() {
        let err = normalize(json!({"raw_sequence": "ATCG"})).unwrap_err();
        assert_eq!(err.field, "sample_id");
    }

    #[test]
    fn test_non_string_sequence_rejected() {
        let err = normalize(json!({"sample_id": "g-204", "raw_sequence": 42})).unwrap_err();
        assert_eq!(err.field, "raw_sequence");
        assert_eq!(err.reason, "expected a string");
    }
}
