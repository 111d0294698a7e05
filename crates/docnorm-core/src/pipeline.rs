//! End-to-end pipeline: project → normalize → identify → group
//!
//! `Pipeline::new` validates the whole configuration up front. `run` then
//! pushes a dataset through every stage and keeps each stage's output, so
//! the input of any stage stays available for diagnostics.

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::grouping::{group_records, GroupingSpec};
use crate::identity::assign_identities;
use crate::normalizer::Normalizer;
use crate::projector::{project_records, FieldSchema};
use crate::Result;

/// Validated, immutable pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    schema: Option<FieldSchema>,
    normalizer: Normalizer,
    grouping: Option<GroupingSpec>,
}

/// Output of every stage of one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub projected: Dataset,
    pub normalized: Dataset,
    pub identified: Dataset,
    pub grouped: Dataset,
}

impl PipelineOutput {
    /// Stage outputs in execution order, with their names
    pub fn stages(&self) -> [(&'static str, &Dataset); 4] {
        [
            ("projected", &self.projected),
            ("normalized", &self.normalized),
            ("identified", &self.identified),
            ("grouped", &self.grouped),
        ]
    }
}

impl Pipeline {
    /// Build a pipeline, validating schema, rules and grouping.
    ///
    /// # Errors
    /// The first configuration error found; nothing has been processed.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let schema = config
            .fields_to_keep
            .as_ref()
            .map(|fields| FieldSchema::new(fields.iter().cloned()))
            .transpose()?;
        let normalizer = Normalizer::new(&config.normalization_map)?;
        let grouping = config
            .grouping
            .as_ref()
            .map(GroupingSpec::from_value)
            .transpose()?;

        Ok(Self {
            schema,
            normalizer,
            grouping,
        })
    }

    pub fn schema(&self) -> Option<&FieldSchema> {
        self.schema.as_ref()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn grouping(&self) -> Option<&GroupingSpec> {
        self.grouping.as_ref()
    }

    /// Run every stage over `dataset`
    pub fn run(&self, dataset: &Dataset) -> PipelineOutput {
        tracing::info!(records = dataset.record_count(), "pipeline started");

        let projected = match &self.schema {
            Some(schema) => dataset.map_records(|records| project_records(records, schema)),
            None => dataset.clone(),
        };
        tracing::info!(
            stage = "projected",
            fields = self.schema.as_ref().map(FieldSchema::len),
            "stage complete"
        );

        let normalized = projected.map_records(|records| self.normalizer.normalize_records(records));
        tracing::info!(stage = "normalized", "stage complete");

        let identified = normalized.map_records(assign_identities);
        tracing::info!(stage = "identified", "stage complete");

        let grouped = match &self.grouping {
            Some(spec) => identified.map_records(|records| group_records(records, spec)),
            None => identified.clone(),
        };
        tracing::info!(
            stage = "grouped",
            records = grouped.record_count(),
            "pipeline finished"
        );

        PipelineOutput {
            projected,
            normalized,
            identified,
            grouped,
        }
    }

    /// Run a plain record sequence and return only the final records
    pub fn run_records(&self, records: Vec<Value>) -> Vec<Value> {
        self.run(&Dataset::Records(records)).grouped.into_records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{compute_identity, is_identity};
    use crate::Error;
    use serde_json::json;

    fn config(value: Value) -> PipelineConfig {
        serde_json::from_value(value).unwrap()
    }

    fn sample_config() -> PipelineConfig {
        config(json!({
            "fields_to_keep": ["name", "sex", "city"],
            "normalization_map": {
                "sex": {
                    "value_mappings": {"\"M\"": "male", "\"F\"": "female"},
                    "default": "unknown"
                },
                "city": {
                    "dynamic_rules": [{"if": {"apply_function": "to_uppercase"}}]
                }
            },
            "grouping": {"id": "id", "person": {"name": "name", "sex": "sex"}, "home": {"city": "city"}}
        }))
    }

    #[test]
    fn test_full_run() {
        let pipeline = Pipeline::new(&sample_config()).unwrap();
        let out = pipeline.run_records(vec![
            json!({"name": "Alice", "sex": "F", "city": "Oslo", "junk": 1}),
            json!({"name": "Bob", "sex": "?"}),
        ]);

        assert_eq!(out.len(), 2);
        assert!(is_identity(out[0]["id"].as_str().unwrap()));
        assert_eq!(out[0]["person"], json!({"name": "Alice", "sex": "female"}));
        assert_eq!(out[0]["home"], json!({"city": "OSLO"}));
        assert_eq!(out[1]["person"], json!({"name": "Bob", "sex": "unknown"}));
        assert_eq!(out[1]["home"], json!({"city": null}));
    }

    #[test]
    fn test_identity_covers_normalized_content() {
        let pipeline = Pipeline::new(&sample_config()).unwrap();
        let output = pipeline.run(&Dataset::Records(vec![json!({"name": "Alice", "sex": "F"})]));

        let Dataset::Records(normalized) = &output.normalized else {
            panic!("expected records");
        };
        let Dataset::Records(grouped) = &output.grouped else {
            panic!("expected records");
        };
        assert_eq!(grouped[0]["id"], json!(compute_identity(&normalized[0])));
    }

    #[test]
    fn test_stage_inputs_are_preserved() {
        let pipeline = Pipeline::new(&sample_config()).unwrap();
        let input = Dataset::Records(vec![json!({"name": "Alice", "sex": "F", "junk": 1})]);
        let output = pipeline.run(&input);

        assert_eq!(
            output.projected,
            Dataset::Records(vec![json!({"name": "Alice", "sex": "F", "city": null})])
        );
        assert_eq!(
            output.normalized,
            Dataset::Records(vec![json!({"name": "Alice", "sex": "female", "city": null})])
        );
        let names: Vec<&str> = output.stages().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["projected", "normalized", "identified", "grouped"]);
    }

    #[test]
    fn test_rerun_yields_same_identities() {
        let pipeline = Pipeline::new(&sample_config()).unwrap();
        let records = vec![json!({"name": "Alice", "sex": "F", "city": "Oslo"})];
        let first = pipeline.run_records(records.clone());
        for i in 0..100 {
            assert_eq!(first, pipeline.run_records(records.clone()), "Determinism failure at iteration {}", i);
        }
    }

    #[test]
    fn test_named_dataset_every_sequence_identified() {
        let pipeline = Pipeline::new(&PipelineConfig::default()).unwrap();
        let input = Dataset::from_value(json!({
            "people": [{"n": 1}, {"n": 2}],
            "places": [{"p": "x"}],
            "version": 3
        }))
        .unwrap();
        let output = pipeline.run(&input).grouped.into_value();

        for seq in ["people", "places"] {
            for record in output[seq].as_array().unwrap() {
                assert!(is_identity(record["id"].as_str().unwrap()));
            }
        }
        assert_eq!(output["version"], json!(3));
    }

    #[test]
    fn test_optional_stages_skipped() {
        let pipeline = Pipeline::new(&PipelineConfig::default()).unwrap();
        assert!(pipeline.schema().is_none());
        assert!(pipeline.grouping().is_none());
        let out = pipeline.run_records(vec![json!({"x": 1, "y": 2})]);
        assert_eq!(
            out,
            vec![json!({
                "x": 1,
                "y": 2,
                "id": "689a8f1d-b954-0258-0476-e38c264278ce-7b1e664320cfb4e9ae8d3a908cf09964"
            })]
        );
    }

    // ── Fail fast ──────────────────────────────────────

    #[test]
    fn test_duplicate_schema_field_rejected() {
        let err = Pipeline::new(&config(json!({"fields_to_keep": ["a", "a"]}))).unwrap_err();
        assert!(matches!(err, Error::DuplicateField(_)));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = Pipeline::new(&config(json!({
            "normalization_map": {"f": {"dynamic_rules": [{"if": {"$regex": "(("}, "then": 1}]}}
        })))
        .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("(("));
    }

    #[test]
    fn test_bad_grouping_rejected() {
        let err = Pipeline::new(&config(json!({"grouping": {"a": 1}}))).unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }
}
