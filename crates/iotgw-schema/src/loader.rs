//! # Document Loader
//!
//! Reads a YAML (or JSON, which is a YAML subset) source into a
//! `serde_json::Value`. The merger and the pipeline go through the
//! [`DocumentLoader`] trait so include resolution can be driven from
//! memory in tests.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A parsed configuration document: string keys to arbitrary nested values.
pub type Document = Map<String, Value>;

/// Source of parsed documents, keyed by path.
pub trait DocumentLoader {
    /// Load and parse the document at `path`.
    ///
    /// An empty source loads as `Value::Null`.
    fn load(&self, path: &Path) -> Result<Value, ConfigError>;
}

/// Loads documents from the local filesystem as UTF-8 YAML.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFileLoader;

impl DocumentLoader for YamlFileLoader {
    fn load(&self, path: &Path) -> Result<Value, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::DocumentRead {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "read document");
        parse_yaml(&content, path)
    }
}

/// Parse YAML text. `origin` is only used for diagnostics.
pub fn parse_yaml(content: &str, origin: &Path) -> Result<Value, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::DocumentParse {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Coerce a loaded root document into a mapping. Null becomes empty.
pub fn into_document(value: Value, origin: &Path) -> Result<Document, ConfigError> {
    match value {
        Value::Null => Ok(Document::new()),
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::DocumentNotMapping {
            path: origin.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_yaml() {
        let yaml = r#"
gateway:
  name: gw-01
  metrics_port: 9100
connectors:
  s1:
    type: mqtt
    params:
      topics: [a, b]
"#;
        let value = parse_yaml(yaml, Path::new("inline.yaml")).unwrap();
        assert_eq!(value["gateway"]["name"], "gw-01");
        assert_eq!(value["gateway"]["metrics_port"], 9100);
        assert_eq!(value["connectors"]["s1"]["params"]["topics"][1], "b");
    }

    #[test]
    fn empty_source_is_null() {
        assert_eq!(parse_yaml("", Path::new("e.yaml")).unwrap(), Value::Null);
        assert_eq!(parse_yaml("  \n\n", Path::new("e.yaml")).unwrap(), Value::Null);
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse_yaml("gateway: [unclosed", Path::new("bad.yaml")).unwrap_err();
        match err {
            ConfigError::DocumentParse { path, reason } => {
                assert_eq!(path, Path::new("bad.yaml"));
                assert!(!reason.is_empty());
            }
            other => panic!("expected DocumentParse, got: {other}"),
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = YamlFileLoader
            .load(&dir.path().join("absent.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DocumentRead { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gw.yaml");
        std::fs::write(&path, "gateway:\n  name: disk\n").unwrap();
        let value = YamlFileLoader.load(&path).unwrap();
        assert_eq!(value, json!({"gateway": {"name": "disk"}}));
    }

    #[test]
    fn into_document_rules() {
        let origin = Path::new("root.yaml");
        assert!(into_document(Value::Null, origin).unwrap().is_empty());
        assert_eq!(
            into_document(json!({"a": 1}), origin).unwrap().get("a"),
            Some(&json!(1))
        );
        assert!(matches!(
            into_document(json!([1, 2]), origin),
            Err(ConfigError::DocumentNotMapping { .. })
        ));
    }
}
