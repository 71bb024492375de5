//! # Fatal Errors
//!
//! Every unrecoverable input problem the pipeline can hit. A `ConfigError`
//! aborts the run at the stage that detected it; nothing downstream runs.
//!
//! Structural and cross-reference problems in an otherwise loadable
//! document are *not* errors in this sense. They are collected as
//! [`Finding`](crate::report::Finding)s so one pass surfaces all of them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that terminate the validation pipeline.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A document file could not be read.
    #[error("cannot read {path}: {source}")]
    DocumentRead {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A document file is not valid YAML.
    #[error("cannot parse YAML {path}: {reason}")]
    DocumentParse {
        /// Path of the file.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The root configuration document parsed to something other than a mapping.
    #[error("{path} did not contain a YAML object")]
    DocumentNotMapping {
        /// Path of the file.
        path: PathBuf,
    },

    /// `includes` is present but is not a sequence.
    #[error("'includes' must be an array of file paths in {path}")]
    IncludesNotSequence {
        /// Path of the including document.
        path: PathBuf,
    },

    /// An `includes` entry is not a string.
    #[error("'includes' entry #{index} in {path} is not a file path string")]
    IncludeEntryNotString {
        /// Path of the including document.
        path: PathBuf,
        /// Zero-based position in the `includes` list.
        index: usize,
    },

    /// An included fragment parsed to a non-mapping value.
    #[error("include '{include}' did not contain a YAML object")]
    FragmentNotMapping {
        /// The include entry as written.
        include: String,
        /// Resolved path of the fragment.
        path: PathBuf,
    },

    /// `connectors` or `bridges` is not a mapping on one side of a merge.
    #[error("'{collection}' must be an object in {source_path}")]
    CollectionNotMapping {
        /// `connectors` or `bridges`.
        collection: String,
        /// The fragment being merged when the problem was found.
        source_path: PathBuf,
    },

    /// Two sources declared the same id in the same collection.
    #[error("duplicate {collection} ids {ids:?} found while merging {source_path}")]
    DuplicateIds {
        /// `connectors` or `bridges`.
        collection: String,
        /// The fragment that introduced the collision.
        source_path: PathBuf,
        /// Colliding ids, sorted.
        ids: Vec<String>,
    },

    /// A schema file could not be read or parsed.
    #[error("cannot load schema {path}: {reason}")]
    SchemaLoad {
        /// Path of the schema file.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// One alias was claimed by two distinct schema files.
    #[error("schema alias '{alias}' is claimed by both {first} and {second}")]
    SchemaAliasCollision {
        /// The contested alias.
        alias: String,
        /// File registered first.
        first: PathBuf,
        /// File that tried to register the same alias.
        second: PathBuf,
    },

    /// The root schema could not be compiled (bad keyword, unresolvable `$ref`).
    #[error("cannot compile schema {schema_id}: {reason}")]
    SchemaCompile {
        /// Identifier of the root schema.
        schema_id: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

impl ConfigError {
    /// Whether the error comes from the schema artifact rather than the
    /// configuration under test.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaLoad { .. } | Self::SchemaAliasCollision { .. } | Self::SchemaCompile { .. }
        )
    }
}
