//! Field projector - fits records onto a fixed, ordered field schema
//!
//! Also home of the field survey helpers used to build a schema and a
//! normalization map skeleton from raw data: `collect_fields` and
//! `collect_field_values`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::canonical::lookup_key;
use crate::{Error, Result};

/// Ordered list of unique field names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<String>,
}

impl FieldSchema {
    /// Build a schema, rejecting duplicate names.
    ///
    /// # Errors
    /// Returns `DuplicateField` naming the first repeated field.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for field in fields {
            let field = field.into();
            if !seen.insert(field.clone()) {
                return Err(Error::DuplicateField(field));
            }
            out.push(field);
        }
        Ok(Self { fields: out })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ── Projection ─────────────────────────────────────────────

/// Project one record onto `schema`.
///
/// The result holds exactly the schema's fields in schema order; fields
/// missing from the record become `null`, fields outside the schema are
/// dropped. Non-object records are returned unchanged.
pub fn project(record: &Value, schema: &FieldSchema) -> Value {
    let Value::Object(source) = record else {
        tracing::debug!("projection: passing through non-object record");
        return record.clone();
    };

    let mut out = Map::with_capacity(schema.len());
    for field in schema.fields() {
        let value = source.get(field).cloned().unwrap_or(Value::Null);
        out.insert(field.clone(), value);
    }
    Value::Object(out)
}

/// Project every record of a sequence
pub fn project_records(records: &[Value], schema: &FieldSchema) -> Vec<Value> {
    records.iter().map(|r| project(r, schema)).collect()
}

// ── Field survey ───────────────────────────────────────────

/// Sorted set of top-level field names across all object records
pub fn collect_fields(records: &[Value]) -> Vec<String> {
    let mut fields = BTreeSet::new();
    for record in records {
        if let Value::Object(map) = record {
            fields.extend(map.keys().cloned());
        }
    }
    fields.into_iter().collect()
}

/// Distinct values observed per field.
///
/// Values are distinct by lookup key, so `1` and `"1"` are both kept.
/// Fields appear in first-seen order; each value list is sorted with
/// `null` first, then by display text.
pub fn collect_field_values(records: &[Value]) -> IndexMap<String, Vec<Value>> {
    let mut seen: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
    for record in records {
        let Value::Object(map) = record else {
            continue;
        };
        for (field, value) in map {
            seen.entry(field.clone())
                .or_default()
                .entry(lookup_key(value))
                .or_insert_with(|| value.clone());
        }
    }

    seen.into_iter()
        .map(|(field, values)| {
            let mut values: Vec<Value> = values.into_values().collect();
            values.sort_by(compare_for_survey);
            (field, values)
        })
        .collect()
}

fn compare_for_survey(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => display_text(a)
            .cmp(&display_text(b))
            .then_with(|| lookup_key(a).cmp(&lookup_key(b))),
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => lookup_key(other),
    }
}
