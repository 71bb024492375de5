//! # Schema Validation
//!
//! Compiles the root gateway schema once (Draft 2020-12) with every `$ref`
//! answered by the [`SchemaStore`], then evaluates documents against it.
//!
//! All violations are collected, not just the first. They come back sorted
//! by path components and then message, independent of the order the
//! engine visits keywords.

use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;
use crate::report::{segments_from_pointer, sort_findings, Finding};
use crate::store::SchemaStore;

/// A compiled gateway schema plus the store it resolves against.
pub struct ConfigValidator {
    store: SchemaStore,
    compiled: jsonschema::Validator,
}

impl std::fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigValidator")
            .field("root", &self.store.root_path())
            .field("aliases", &self.store.alias_count())
            .finish()
    }
}

impl ConfigValidator {
    /// Build the store from `root_schema` and compile it.
    ///
    /// # Errors
    ///
    /// Store build failures, or [`ConfigError::SchemaCompile`] when the
    /// grammar is invalid or references something the store cannot supply.
    pub fn from_schema_path(root_schema: &Path) -> Result<Self, ConfigError> {
        Self::new(SchemaStore::build(root_schema)?)
    }

    /// Compile the root schema of an already built store.
    ///
    /// Every sub-schema is registered up front under its URI aliases, so
    /// relative references inside fetched sub-schemas resolve against the
    /// sub-schema's own identifier.
    pub fn new(store: SchemaStore) -> Result<Self, ConfigError> {
        let resources = store
            .uri_resources()
            .map(|(uri, schema)| {
                jsonschema::Resource::from_contents(Value::clone(schema))
                    .map(|resource| (uri.to_string(), resource))
                    .map_err(|e| ConfigError::SchemaCompile {
                        schema_id: uri.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let compiled = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .with_resources(resources.into_iter())
            .with_retriever(store.retriever())
            .build(&store.root_with_base())
            .map_err(|e| ConfigError::SchemaCompile {
                schema_id: store.root_id().to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(schema = store.root_id(), "compiled gateway schema");
        Ok(Self { store, compiled })
    }

    /// The store backing reference resolution.
    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// Every structural violation in `instance`, sorted.
    pub fn validate(&self, instance: &Value) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .compiled
            .iter_errors(instance)
            .map(|err| {
                let pointer = err.instance_path.to_string();
                Finding::schema(segments_from_pointer(&pointer, instance), err.to_string())
            })
            .collect();
        sort_findings(&mut findings);
        tracing::debug!(count = findings.len(), "schema evaluation finished");
        findings
    }

    /// Quick yes/no check without collecting findings.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::PathSegment;
    use serde_json::json;
    use std::path::PathBuf;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Root schema with a relative reference and a sub-schema that refers
    /// to a sibling through its external identifier.
    fn split_grammar() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "gw.schema.json",
            r#"{
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "object",
                "required": ["name", "port"],
                "properties": {
                    "name": {"type": "string"},
                    "port": {"$ref": "schemas/port.schema.json"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            }"#,
        );
        write(
            dir.path(),
            "schemas/port.schema.json",
            r#"{
                "$id": "https://example/schemas/port.schema.json",
                "$ref": "number.schema.json"
            }"#,
        );
        write(
            dir.path(),
            "schemas/number.schema.json",
            r#"{"type": "integer", "minimum": 1, "maximum": 65535}"#,
        );
        (dir, root)
    }

    #[test]
    fn valid_document_has_no_findings() {
        let (_dir, root) = split_grammar();
        let validator = ConfigValidator::from_schema_path(&root).unwrap();
        let doc = json!({"name": "gw", "port": 1883, "tags": ["a"]});
        assert!(validator.validate(&doc).is_empty());
        assert!(validator.is_valid(&doc));
    }

    #[test]
    fn collects_every_violation_in_order() {
        let (_dir, root) = split_grammar();
        let validator = ConfigValidator::from_schema_path(&root).unwrap();
        let doc = json!({"port": 0, "tags": ["ok", 5, true]});
        let findings = validator.validate(&doc);

        let paths: Vec<Vec<PathSegment>> = findings.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec![],
                vec![PathSegment::from("port")],
                vec![PathSegment::from("tags"), PathSegment::Index(1)],
                vec![PathSegment::from("tags"), PathSegment::Index(2)],
            ]
        );
        assert!(findings[0].message.contains("name"));
    }

    #[test]
    fn output_is_stable_across_runs() {
        let (_dir, root) = split_grammar();
        let validator = ConfigValidator::from_schema_path(&root).unwrap();
        let doc = json!({"name": 1, "port": "x", "tags": [1, 2, 3]});
        let first: Vec<String> = validator.validate(&doc).iter().map(ToString::to_string).collect();
        let second: Vec<String> = validator.validate(&doc).iter().map(ToString::to_string).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn sibling_reference_inside_sub_schema_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "gw.schema.json",
            r#"{"properties": {"a": {"$ref": "schemas/a.schema.json"}}}"#,
        );
        write(
            dir.path(),
            "schemas/a.schema.json",
            r#"{
                "$id": "https://example/schemas/a.schema.json",
                "type": "object",
                "properties": {
                    "b": {"$ref": "b.schema.json"},
                    "port": {"$ref": "common.schema.json#/$defs/port"}
                }
            }"#,
        );
        write(
            dir.path(),
            "schemas/b.schema.json",
            r#"{"$id": "https://example/schemas/b.schema.json", "type": "string"}"#,
        );
        write(
            dir.path(),
            "schemas/common.schema.json",
            r#"{
                "$id": "https://example/schemas/common.schema.json",
                "$defs": {"port": {"type": "integer", "minimum": 1}}
            }"#,
        );
        let validator = ConfigValidator::from_schema_path(&root).unwrap();

        assert!(validator.is_valid(&json!({"a": {"b": "x", "port": 502}})));
        let findings = validator.validate(&json!({"a": {"b": 7, "port": 0}}));
        let paths: Vec<String> = findings.iter().map(|f| f.to_string()).collect();
        assert_eq!(findings.len(), 2, "{paths:?}");
        assert_eq!(findings[0].path, vec![PathSegment::from("a"), PathSegment::from("b")]);
        assert_eq!(findings[1].path, vec![PathSegment::from("a"), PathSegment::from("port")]);
    }

    #[test]
    fn unresolvable_reference_fails_compile() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "gw.schema.json",
            r#"{"properties": {"x": {"$ref": "https://example/schemas/missing.schema.json"}}}"#,
        );
        let err = ConfigValidator::from_schema_path(&root).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaCompile { .. }), "got: {err}");
    }

    #[test]
    fn invalid_keyword_fails_compile() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "gw.schema.json", r#"{"type": 12}"#);
        assert!(matches!(
            ConfigValidator::from_schema_path(&root),
            Err(ConfigError::SchemaCompile { .. })
        ));
    }

    #[test]
    fn debug_impl_names_root() {
        let (_dir, root) = split_grammar();
        let validator = ConfigValidator::from_schema_path(&root).unwrap();
        let dbg = format!("{validator:?}");
        assert!(dbg.contains("ConfigValidator"));
        assert!(dbg.contains("gw.schema.json"));
    }
}
