//! # Include Merger
//!
//! Folds the fragments listed under a root document's `includes:` into one
//! document. Merge policy per top-level key:
//!
//! - `connectors`, `bridges`: union of id-keyed mappings. The same id from
//!   two sources is fatal; nothing is silently overwritten.
//! - `includes` inside a fragment: ignored. Inclusion is one level deep.
//! - anything else: the later source replaces the earlier value wholesale.
//!
//! The root's own declarations seed the accumulator, so they take part in
//! the duplicate check against every fragment.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::loader::{Document, DocumentLoader};

/// Top-level key listing fragment paths.
pub const INCLUDES_KEY: &str = "includes";

/// Id-keyed collections that merge by union.
pub const ID_COLLECTIONS: [&str; 2] = ["connectors", "bridges"];

/// Merge every fragment named by `root`'s `includes` into `root`.
///
/// `root_path` is the path `root` was loaded from; relative include paths
/// resolve against its directory. The returned document carries no
/// `includes` key.
///
/// # Errors
///
/// Any fragment load failure, a malformed `includes` list, a non-mapping
/// fragment, a non-mapping id collection, or a duplicate id.
pub fn merge_includes(
    mut root: Document,
    root_path: &Path,
    loader: &dyn DocumentLoader,
) -> Result<Document, ConfigError> {
    let Some(includes) = root.shift_remove(INCLUDES_KEY) else {
        return Ok(root);
    };

    let entries = match includes {
        Value::Array(entries) => entries,
        other if is_blank(&other) => return Ok(root),
        _ => {
            return Err(ConfigError::IncludesNotSequence {
                path: root_path.to_path_buf(),
            })
        }
    };

    let base_dir = root_path.parent().unwrap_or_else(|| Path::new(""));
    for (index, entry) in entries.iter().enumerate() {
        let Value::String(include) = entry else {
            return Err(ConfigError::IncludeEntryNotString {
                path: root_path.to_path_buf(),
                index,
            });
        };
        let fragment_path = resolve_include(base_dir, include);
        tracing::debug!(
            include = %include,
            path = %fragment_path.display(),
            "merging include"
        );

        let fragment = match loader.load(&fragment_path)? {
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::FragmentNotMapping {
                    include: include.clone(),
                    path: fragment_path,
                })
            }
        };
        merge_fragment(&mut root, fragment, &fragment_path)?;
    }

    tracing::info!(
        root = %root_path.display(),
        fragments = entries.len(),
        "merged includes"
    );
    Ok(root)
}

/// Merge one fragment into the accumulator under the per-key policy.
///
/// `source` names the fragment in error messages.
pub fn merge_fragment(
    base: &mut Document,
    fragment: Document,
    source: &Path,
) -> Result<(), ConfigError> {
    for (key, value) in fragment {
        if key == INCLUDES_KEY {
            continue;
        }
        if ID_COLLECTIONS.contains(&key.as_str()) {
            merge_collection(base, &key, value, source)?;
        } else {
            base.insert(key, value);
        }
    }
    Ok(())
}

fn merge_collection(
    base: &mut Document,
    collection: &str,
    incoming: Value,
    source: &Path,
) -> Result<(), ConfigError> {
    let not_mapping = || ConfigError::CollectionNotMapping {
        collection: collection.to_string(),
        source_path: source.to_path_buf(),
    };

    let incoming = match incoming {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        _ => return Err(not_mapping()),
    };

    let slot = base
        .entry(collection.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    let Value::Object(existing) = slot else {
        return Err(not_mapping());
    };

    let mut duplicates: Vec<String> = incoming
        .keys()
        .filter(|id| existing.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        return Err(ConfigError::DuplicateIds {
            collection: collection.to_string(),
            source_path: source.to_path_buf(),
            ids: duplicates,
        });
    }

    existing.extend(incoming);
    Ok(())
}

/// Empty-ish `includes` values mean "nothing to include".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) | Value::Array(_) => false,
    }
}

fn resolve_include(base_dir: &Path, include: &str) -> PathBuf {
    let path = Path::new(include);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
