//! # Schema Store
//!
//! The gateway grammar is split across a root schema and a sibling
//! `schemas/` directory of per-protocol sub-schemas. Sub-schemas were
//! authored with absolute `https://example/schemas/<file>` identifiers,
//! so every file is registered under several aliases and all `$ref`
//! resolution happens against this table. Nothing is ever fetched over
//! the network.
//!
//! Aliases registered per file:
//!
//! | alias                                   | root | sub-schema |
//! |-----------------------------------------|------|------------|
//! | `file://` URI of the canonical path     | yes  | yes        |
//! | bare filename                           | yes  | yes        |
//! | `https://example/schemas/<filename>`    | no   | yes        |
//! | the file's own `$id`, when declared     | yes  | yes        |
//!
//! All aliases of one file share a single `Arc<Value>`; an alias claimed
//! by two different files is fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::ConfigError;

/// Name of the sub-schema directory next to the root schema.
pub const SCHEMA_SUBDIR: &str = "schemas";

/// Filename suffix identifying sub-schema files.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// Prefix of the external identifiers sub-schemas were authored with.
pub const EXTERNAL_ID_PREFIX: &str = "https://example/schemas/";

#[derive(Debug, Clone)]
struct StoreEntry {
    path: PathBuf,
    schema: Arc<Value>,
}

type AliasTable = BTreeMap<String, StoreEntry>;

/// Immutable alias → schema table built from a root schema file.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    root_path: PathBuf,
    root_id: String,
    root: Arc<Value>,
    entries: Arc<AliasTable>,
}

impl SchemaStore {
    /// Build the store from the root schema at `root_schema`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SchemaLoad`] if the root or any sub-schema cannot be
    /// read or parsed, [`ConfigError::SchemaAliasCollision`] if two files
    /// claim the same alias.
    pub fn build(root_schema: &Path) -> Result<Self, ConfigError> {
        let root_path =
            std::fs::canonicalize(root_schema).map_err(|e| ConfigError::SchemaLoad {
                path: root_schema.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut entries = AliasTable::new();

        let root = Arc::new(load_json(&root_path)?);
        let root_id = file_uri(&root_path)?;
        let root_entry = StoreEntry {
            path: root_path.clone(),
            schema: Arc::clone(&root),
        };
        register(&mut entries, root_id.clone(), &root_entry)?;
        register(&mut entries, file_name(&root_path), &root_entry)?;
        if let Some(id) = declared_id(&root) {
            register(&mut entries, id, &root_entry)?;
        }

        let schemas_dir = root_path
            .parent()
            .map(|p| p.join(SCHEMA_SUBDIR))
            .unwrap_or_else(|| PathBuf::from(SCHEMA_SUBDIR));

        if schemas_dir.is_dir() {
            for path in list_sub_schemas(&schemas_dir)? {
                let schema = Arc::new(load_json(&path)?);
                let name = file_name(&path);
                let entry = StoreEntry {
                    path: path.clone(),
                    schema: Arc::clone(&schema),
                };
                register(&mut entries, file_uri(&path)?, &entry)?;
                register(&mut entries, name.clone(), &entry)?;
                register(&mut entries, format!("{EXTERNAL_ID_PREFIX}{name}"), &entry)?;
                if let Some(id) = declared_id(&schema) {
                    register(&mut entries, id, &entry)?;
                }
                tracing::debug!(path = %path.display(), "registered sub-schema");
            }
        } else {
            tracing::warn!(
                dir = %schemas_dir.display(),
                "no sub-schema directory next to root schema"
            );
        }

        let store = Self {
            root_path,
            root_id,
            root,
            entries: Arc::new(entries),
        };
        tracing::info!(
            root = %store.root_path.display(),
            documents = store.document_count(),
            aliases = store.alias_count(),
            "built schema store"
        );
        Ok(store)
    }

    /// Canonical path of the root schema.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// `file://` identifier of the root schema.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// The parsed root schema.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Number of registered aliases.
    pub fn alias_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct schema files in the store.
    pub fn document_count(&self) -> usize {
        let mut paths: Vec<&Path> = self.entries.values().map(|e| e.path.as_path()).collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }

    /// All registered aliases, sorted.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Look up a schema by exact alias.
    pub fn get(&self, alias: &str) -> Option<&Arc<Value>> {
        self.entries.get(alias).map(|e| &e.schema)
    }

    /// Resolve a reference target: exact alias first, then its bare filename.
    pub fn resolve(&self, uri: &str) -> Option<&Arc<Value>> {
        lookup(&self.entries, uri)
    }

    /// Sub-schemas keyed by every alias that is an absolute URI.
    ///
    /// Bare filename aliases and the root's own entries are left out; the
    /// root is compiled directly and filenames are not valid registry keys.
    pub fn uri_resources(&self) -> impl Iterator<Item = (&str, &Arc<Value>)> {
        let root_path = self.root_path.as_path();
        self.entries
            .iter()
            .filter(move |(alias, entry)| entry.path != root_path && Url::parse(alias).is_ok())
            .map(|(alias, entry)| (alias.as_str(), &entry.schema))
    }

    /// The root schema with a base URI to resolve relative references against.
    ///
    /// A root without `$id` is given its `file://` identifier.
    pub fn root_with_base(&self) -> Value {
        let mut root = Value::clone(&self.root);
        if let Value::Object(ref mut map) = root {
            if !map.contains_key("$id") {
                map.insert("$id".to_string(), Value::String(self.root_id.clone()));
            }
        }
        root
    }

    /// A `jsonschema` retriever answering only from this store.
    pub fn retriever(&self) -> LocalSchemaRetriever {
        LocalSchemaRetriever {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Resolves `$ref` targets from a [`SchemaStore`] without network access.
pub struct LocalSchemaRetriever {
    entries: Arc<AliasTable>,
}

impl jsonschema::Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &jsonschema::Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        match lookup(&self.entries, uri_str) {
            Some(schema) => Ok(Value::clone(schema)),
            None => Err(format!("schema not found in local store for URI: {uri_str}").into()),
        }
    }
}

fn lookup<'a>(entries: &'a AliasTable, uri: &str) -> Option<&'a Arc<Value>> {
    let uri = uri.split('#').next().unwrap_or(uri);
    if let Some(entry) = entries.get(uri) {
        return Some(&entry.schema);
    }
    let filename = uri.rsplit('/').next().unwrap_or(uri);
    entries.get(filename).map(|e| &e.schema)
}

fn register(entries: &mut AliasTable, alias: String, entry: &StoreEntry) -> Result<(), ConfigError> {
    if let Some(existing) = entries.get(&alias) {
        if Arc::ptr_eq(&existing.schema, &entry.schema) {
            return Ok(());
        }
        return Err(ConfigError::SchemaAliasCollision {
            alias,
            first: existing.path.clone(),
            second: entry.path.clone(),
        });
    }
    entries.insert(alias, entry.clone());
    Ok(())
}

fn list_sub_schemas(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let read_err = |e: std::io::Error| ConfigError::SchemaLoad {
        path: dir.to_path_buf(),
        reason: format!("cannot read schema directory: {e}"),
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SCHEMA_FILE_SUFFIX));
        if matches && path.is_file() {
            // Canonical so file URIs agree with how the root was registered.
            let path = std::fs::canonicalize(&path).map_err(|e| ConfigError::SchemaLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_json(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SchemaLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::SchemaLoad {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })
}

fn file_uri(path: &Path) -> Result<String, ConfigError> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| ConfigError::SchemaLoad {
            path: path.to_path_buf(),
            reason: "path cannot be expressed as a file URI".to_string(),
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn declared_id(schema: &Value) -> Option<String> {
    schema.get("$id").and_then(Value::as_str).map(str::to_string)
}
