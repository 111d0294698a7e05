//! docnorm core - record normalization and canonicalization engine
//!
//! Turns heterogeneous, semi-structured records into canonical,
//! deduplicated, hierarchically shaped documents ready for a document
//! store.
//!
//! # Architecture
//!
//! ```text
//! raw records → Projector → Normalizer (Rule Engine per field)
//!                              ↓
//!                           Identity (SHA-256 over canonical JSON)
//!                              ↓
//!                           Grouping → nested documents
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same content always yields the same identity
//! - **Fail fast**: configuration is validated before any record is touched
//! - **Total**: per-record anomalies resolve by fallback, never by error
//! - **Pure**: every stage returns new records; inputs are left untouched

pub mod canonical;
pub mod config;
pub mod dataset;
pub mod error;
pub mod grouping;
pub mod identity;
pub mod normalizer;
pub mod pipeline;
pub mod projector;
pub mod rules;

pub use canonical::{canonical_json, lookup_key};
pub use config::PipelineConfig;
pub use dataset::{concatenate, Dataset};
pub use error::{Error, Result};
pub use grouping::{group_records, GroupingNode, GroupingSpec};
pub use identity::{assign_identities, compute_identity, with_identity, ID_FIELD};
pub use normalizer::{generate_map_skeleton, NormalizationMap, Normalizer};
pub use pipeline::{Pipeline, PipelineOutput};
pub use projector::{collect_field_values, collect_fields, project, project_records, FieldSchema};
pub use rules::{CompiledRuleSet, FieldRuleSet, Function, RuleSpec};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_fixture_pipeline_end_to_end() {
        let config = PipelineConfig::load(fixture("config.json")).unwrap();
        let pipeline = Pipeline::new(&config).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fixture("records.json")).unwrap()).unwrap();
        let output = pipeline.run(&Dataset::from_value(raw).unwrap());

        let grouped = output.grouped.into_records();
        assert_eq!(grouped.len(), 4);
        for record in &grouped {
            assert!(identity::is_identity(record["id"].as_str().unwrap()));
            assert!(record["profile"].is_object());
            assert!(record["contact"].is_object());
        }
        assert_eq!(grouped[0]["profile"]["status"], json!("active"));
        assert_eq!(grouped[1]["profile"]["status"], json!("inactive"));
        assert_eq!(grouped[2]["profile"]["status"], json!("UNKNOWN"));
        assert_eq!(grouped[0]["contact"]["country"], json!("NO"));
    }

    #[test]
    fn test_duplicate_raw_records_collapse_to_one_identity() {
        let pipeline = Pipeline::new(&PipelineConfig::default()).unwrap();
        let out = pipeline.run_records(vec![json!({"a": 1, "b": [1]}), json!({"b": [1], "a": 1})]);
        assert_eq!(out[0]["id"], out[1]["id"]);
    }

    #[test]
    fn test_separately_computed_identities_match() {
        let a = compute_identity(&json!({"x": 1, "y": 2}));
        let b = compute_identity(&serde_json::from_str(r#"{"y":2,"x":1}"#).unwrap());
        assert_eq!(a, b);
    }
}
