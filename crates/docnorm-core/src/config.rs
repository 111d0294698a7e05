//! Pipeline configuration
//!
//! The configuration object the orchestration layer hands to the core. It
//! is plain data; [`crate::Pipeline::new`] is where it gets validated.
//!
//! Files are decoded as YAML when their extension is `.yaml` or `.yml`,
//! and as JSON otherwise.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalizer::NormalizationMap;
use crate::{Error, Result};

/// Everything the core needs for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Field schema for projection; projection is skipped when absent
    #[serde(default)]
    pub fields_to_keep: Option<Vec<String>>,

    #[serde(default)]
    pub normalization_map: NormalizationMap,

    /// Grouping specification tree; grouping is skipped when absent
    #[serde(default)]
    pub grouping: Option<Value>,
}

impl PipelineConfig {
    /// Read a pipeline configuration file.
    ///
    /// Keys other than the three above (`dataPaths`, ...) belong to the
    /// orchestration layer and are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: PipelineConfig = read_document(path)?;
        tracing::info!(
            path = %path.display(),
            fields = config.fields_to_keep.as_ref().map_or(0, Vec::len),
            rules = config.normalization_map.len(),
            grouping = config.grouping.is_some(),
            "loaded pipeline config"
        );
        Ok(config)
    }
}

/// Read and decode a JSON or YAML document
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if is_yaml(path) {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_config_ignores_orchestration_keys() {
        let file = write_temp(
            ".json",
            r#"{
                "fields_to_keep": ["a", "b"],
                "normalization_map": {"a": {"default": "X"}},
                "grouping": {"id": "id"},
                "dataPaths": {"rawDir": "data/raw"}
            }"#,
        );
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.fields_to_keep, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(config.normalization_map.len(), 1);
        assert!(config.grouping.is_some());
    }

    #[test]
    fn test_load_yaml_config() {
        let yaml = [
            "fields_to_keep: [name, status]",
            "normalization_map:",
            "  status:",
            "    dynamic_rules:",
            "      - if: {$regex: '^act'}",
            "        then: active",
        ]
        .join("\n");
        let file = write_temp(".yml", &yaml);
        let config = PipelineConfig::load(file.path()).unwrap();
        let rules = config.normalization_map.get("status").unwrap();
        assert_eq!(rules.dynamic_rules.len(), 1);
        assert_eq!(rules.dynamic_rules[0].action, serde_json::json!("active"));
        assert_eq!(config.grouping, None);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let file = write_temp(".json", "{}");
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PipelineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let file = write_temp(".json", "{not json");
        assert!(matches!(PipelineConfig::load(file.path()), Err(Error::Json(_))));
    }
}
