//! Dataset shapes accepted at the process boundary
//!
//! Either a plain record sequence (`[...]`) or an object whose array
//! members are record sequences (`{"people": [...], "places": [...]}`).
//! Non-array members of the object form are carried through untouched.

use serde_json::{Map, Value};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Records(Vec<Value>),
    Named(Map<String, Value>),
}

impl Dataset {
    /// Interpret a decoded document as a dataset.
    ///
    /// # Errors
    /// `InvalidInput` when the document is neither an array nor an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(records) => Ok(Dataset::Records(records)),
            Value::Object(named) => Ok(Dataset::Named(named)),
            other => Err(Error::InvalidInput(format!(
                "expected an array of records or an object of record arrays, found {}",
                other
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Dataset::Records(records) => Value::Array(records),
            Dataset::Named(named) => Value::Object(named),
        }
    }

    /// Flatten into one record sequence, dropping non-array members
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Dataset::Records(records) => records,
            Dataset::Named(named) => named
                .into_iter()
                .filter_map(|(_, member)| match member {
                    Value::Array(records) => Some(records),
                    _ => None,
                })
                .flatten()
                .collect(),
        }
    }

    /// Apply a whole-sequence stage to every record sequence
    pub fn map_records<F>(&self, mut stage: F) -> Dataset
    where
        F: FnMut(&[Value]) -> Vec<Value>,
    {
        match self {
            Dataset::Records(records) => Dataset::Records(stage(records)),
            Dataset::Named(named) => Dataset::Named(
                named
                    .iter()
                    .map(|(name, member)| {
                        let mapped = match member {
                            Value::Array(records) => Value::Array(stage(records)),
                            other => other.clone(),
                        };
                        (name.clone(), mapped)
                    })
                    .collect(),
            ),
        }
    }

    /// All records, across every contained sequence
    pub fn records(&self) -> Vec<&Value> {
        match self {
            Dataset::Records(records) => records.iter().collect(),
            Dataset::Named(named) => named
                .values()
                .filter_map(Value::as_array)
                .flatten()
                .collect(),
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            Dataset::Records(records) => records.len(),
            Dataset::Named(named) => named
                .values()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .sum(),
        }
    }
}

/// Join several decoded documents into one record sequence.
///
/// `inputs` pairs a label (usually the file path) with its document.
/// Documents that are not arrays are skipped with a warning.
pub fn concatenate<I, S>(inputs: I) -> Vec<Value>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let mut all = Vec::new();
    for (label, document) in inputs {
        match document {
            Value::Array(records) => {
                tracing::debug!(source = label.as_ref(), records = records.len(), "concatenating");
                all.extend(records);
            }
            _ => {
                tracing::warn!(source = label.as_ref(), "document is not a JSON array; skipping");
            }
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_shapes() {
        assert!(matches!(Dataset::from_value(json!([])), Ok(Dataset::Records(_))));
        assert!(matches!(Dataset::from_value(json!({"a": []})), Ok(Dataset::Named(_))));
        let err = Dataset::from_value(json!("nope")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_map_records_over_named_sequences() {
        let ds = Dataset::from_value(json!({"a": [1, 2], "b": [3], "meta": "keep"})).unwrap();
        let doubled = ds.map_records(|records| {
            records
                .iter()
                .map(|r| json!(r.as_i64().unwrap() * 2))
                .collect()
        });
        assert_eq!(doubled.into_value(), json!({"a": [2, 4], "b": [6], "meta": "keep"}));
    }

    #[test]
    fn test_record_count_and_records() {
        let ds = Dataset::from_value(json!({"a": [1, 2], "b": [3], "c": 4})).unwrap();
        assert_eq!(ds.record_count(), 3);
        assert_eq!(ds.records(), vec![&json!(1), &json!(2), &json!(3)]);
        assert_eq!(ds.into_records(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_concatenate_skips_non_arrays() {
        let all = concatenate(vec![
            ("one.json", json!([{"a": 1}])),
            ("bad.json", json!({"a": 1})),
            ("two.json", json!([{"b": 2}, {"c": 3}])),
        ]);
        assert_eq!(all, vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]);
    }
}
