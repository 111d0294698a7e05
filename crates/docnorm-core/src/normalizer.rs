//! Normalization orchestrator - applies field rule sets across records
//!
//! # Pipeline
//!
//! `NormalizationMap (file) → Normalizer::new (validate + compile) → normalize_records`
//!
//! # Guarantees
//!
//! - **Fail fast**: every rule of every field is validated before any record
//!   is touched.
//! - **Total**: once built, a `Normalizer` never fails on record content.
//! - **Pure**: records are never mutated; a new record is returned and field
//!   order plus unmapped fields are preserved.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::lookup_key;
use crate::config::read_document;
use crate::rules::{CompiledRuleSet, FieldRuleSet};
use crate::Result;

// ── Normalization map ──────────────────────────────────────

/// Field name → rule set, as stored in a normalization map file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizationMap(pub IndexMap<String, FieldRuleSet>);

impl NormalizationMap {
    /// Read a normalization map from a JSON or YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_document(path.as_ref())
    }

    pub fn get(&self, field: &str) -> Option<&FieldRuleSet> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldRuleSet)> for NormalizationMap {
    fn from_iter<T: IntoIterator<Item = (String, FieldRuleSet)>>(iter: T) -> Self {
        NormalizationMap(iter.into_iter().collect())
    }
}

/// Build an editable normalization map from surveyed field values.
///
/// Every kept field gets one `value_mappings` entry per observed value,
/// keyed by lookup key and mapped to the value itself, so the unedited
/// skeleton changes nothing. `fields_to_keep = None` keeps every field.
pub fn generate_map_skeleton(
    field_values: &IndexMap<String, Vec<Value>>,
    fields_to_keep: Option<&[String]>,
) -> NormalizationMap {
    field_values
        .iter()
        .filter(|(field, _)| fields_to_keep.map_or(true, |keep| keep.contains(*field)))
        .map(|(field, values)| {
            let value_mappings = values
                .iter()
                .map(|v| (lookup_key(v), v.clone()))
                .collect();
            let rules = FieldRuleSet {
                value_mappings,
                dynamic_rules: Vec::new(),
                default: None,
            };
            (field.clone(), rules)
        })
        .collect()
}

// ── Normalizer ─────────────────────────────────────────────

/// Compiled normalization map, read-only for the lifetime of a run
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fields: IndexMap<String, CompiledRuleSet>,
}

impl Normalizer {
    /// Validate and compile every field of `map`.
    ///
    /// # Errors
    /// The first `InvalidRule` / `InvalidPattern` found, naming the field.
    pub fn new(map: &NormalizationMap) -> Result<Self> {
        let mut fields = IndexMap::with_capacity(map.len());
        for (field, spec) in &map.0 {
            fields.insert(field.clone(), CompiledRuleSet::compile(field, spec)?);
        }
        tracing::debug!(fields = fields.len(), "normalization map compiled");
        Ok(Self { fields })
    }

    /// Rule set for `field`, if the map declares one
    pub fn rules_for(&self, field: &str) -> Option<&CompiledRuleSet> {
        self.fields.get(field)
    }

    /// Resolve a single field value; unmapped fields are returned unchanged
    pub fn resolve(&self, field: &str, value: &Value) -> Value {
        match self.fields.get(field) {
            Some(rules) => rules.resolve(value),
            None => value.clone(),
        }
    }

    /// Normalize one record. Non-object records are returned unchanged.
    pub fn normalize_record(&self, record: &Value) -> Value {
        let Value::Object(source) = record else {
            tracing::debug!("normalization: passing through non-object record");
            return record.clone();
        };

        let mut out = Map::with_capacity(source.len());
        for (field, value) in source {
            out.insert(field.clone(), self.resolve(field, value));
        }
        Value::Object(out)
    }

    /// Normalize every record of a sequence
    pub fn normalize_records(&self, records: &[Value]) -> Vec<Value> {
        records.iter().map(|r| self.normalize_record(r)).collect()
    }
}
