//! Grouping transformer - reshapes flat records into nested documents
//!
//! A grouping specification is a JSON object tree. Leaves are source field
//! names; objects are nested output levels; the entry `"id": "id"` carries
//! the record identity through at that level.
//!
//! ```text
//! spec   {"id": "id", "meta": {"name": "n"}}
//! record {"id": "abc", "n": "Alice", "extra": 1}
//! output {"id": "abc", "meta": {"name": "Alice"}}
//! ```
//!
//! Source fields absent from the record are omitted, not null-filled.
//! Nested levels are always emitted, even when empty.

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::read_document;
use crate::identity::ID_FIELD;
use crate::{Error, Result};

/// One entry of a grouping level
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingNode {
    /// `"id": "id"` - copy the record identity
    Identity,
    /// Copy the named source field
    Field(String),
    /// Build a nested level
    Nested(GroupingSpec),
}

/// Validated grouping specification, entries in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingSpec {
    entries: Vec<(String, GroupingNode)>,
}

impl GroupingSpec {
    /// Parse and validate a specification tree.
    ///
    /// # Errors
    /// `InvalidGrouping` when the root is not an object or an entry is
    /// neither a string nor an object; the error carries the dotted path.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::parse_level(map, ""),
            other => Err(Error::InvalidGrouping {
                path: "<root>".into(),
                message: format!("expected an object, found {}", other),
            }),
        }
    }

    /// Read a specification from a JSON or YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let value: Value = read_document(path.as_ref())?;
        Self::from_value(&value)
    }

    fn parse_level(map: &Map<String, Value>, prefix: &str) -> Result<Self> {
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            let node = match value {
                Value::String(field) if key == ID_FIELD && field == ID_FIELD => GroupingNode::Identity,
                Value::String(field) => GroupingNode::Field(field.clone()),
                Value::Object(nested) => GroupingNode::Nested(Self::parse_level(nested, &path)?),
                other => {
                    return Err(Error::InvalidGrouping {
                        path,
                        message: format!("expected a field name or an object, found {}", other),
                    })
                }
            };
            entries.push((key.clone(), node));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, GroupingNode)] {
        &self.entries
    }

    /// Nesting depth; a flat specification has depth 1
    pub fn depth(&self) -> usize {
        1 + self
            .entries
            .iter()
            .map(|(_, node)| match node {
                GroupingNode::Nested(spec) => spec.depth(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// The specification as a JSON object tree
    pub fn to_value(&self) -> Value {
        let mut out = Map::with_capacity(self.entries.len());
        for (key, node) in &self.entries {
            let value = match node {
                GroupingNode::Identity => Value::String(ID_FIELD.to_string()),
                GroupingNode::Field(field) => Value::String(field.clone()),
                GroupingNode::Nested(spec) => spec.to_value(),
            };
            out.insert(key.clone(), value);
        }
        Value::Object(out)
    }

    /// Reshape one flat record.
    ///
    /// Non-object records have no fields, so only the nested levels appear.
    pub fn apply(&self, record: &Value) -> Value {
        Value::Object(self.apply_level(record.as_object()))
    }

    fn apply_level(&self, record: Option<&Map<String, Value>>) -> Map<String, Value> {
        let mut out = Map::with_capacity(self.entries.len());
        for (key, node) in &self.entries {
            match node {
                GroupingNode::Identity => {
                    if let Some(id) = record.and_then(|r| r.get(ID_FIELD)) {
                        out.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                GroupingNode::Field(field) => {
                    if let Some(value) = record.and_then(|r| r.get(field)) {
                        out.insert(key.clone(), value.clone());
                    }
                }
                GroupingNode::Nested(spec) => {
                    out.insert(key.clone(), Value::Object(spec.apply_level(record)));
                }
            }
        }
        out
    }
}

/// Reshape every record of a sequence
pub fn group_records(records: &[Value], spec: &GroupingSpec) -> Vec<Value> {
    records.iter().map(|r| spec.apply(r)).collect()
}
