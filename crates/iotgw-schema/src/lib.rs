//! # iotgw-schema — Gateway Configuration Validation
//!
//! Decides whether an IoT gateway configuration is structurally and
//! referentially valid before the daemon ever reads it.
//!
//! ## Pipeline
//!
//! - [`loader`] parses YAML sources into JSON values.
//! - [`merge`] folds a root document's `includes` into one document.
//!   `connectors` and `bridges` are unioned with duplicate rejection;
//!   every other top-level key is last-writer-wins.
//! - [`store`] indexes the root grammar and every `schemas/*.schema.json`
//!   under several aliases so `$ref`s resolve without the network.
//! - [`validate`] compiles the grammar once and reports every violation.
//! - [`crossref`] checks that each bridge endpoint names a connector.
//! - [`fragment`] wraps a standalone protocol fragment so it can be checked
//!   against the same grammar.
//! - [`pipeline`] wires these together for full documents, single
//!   fragments and directories of protocol templates.
//!
//! ## Error Model
//!
//! Unrecoverable input problems are [`ConfigError`]s and end the run.
//! Schema violations and dangling references are [`Finding`]s, collected
//! in a [`Report`] in a deterministic order. Exit codes are left to the
//! caller.

pub mod crossref;
pub mod error;
pub mod fragment;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod validate;

pub use crossref::check_cross_references;
pub use error::ConfigError;
pub use fragment::{is_known_protocol, wrap_fragment, KNOWN_PROTOCOLS};
pub use loader::{Document, DocumentLoader, YamlFileLoader};
pub use merge::merge_includes;
pub use pipeline::{
    assemble, assemble_fragment, check_document, check_fragment, validate_config,
    validate_fragment, validate_protocol_dir, FragmentBatchReport, FragmentFailure,
    FragmentProblem,
};
pub use report::{Finding, FindingKind, PathSegment, Report};
pub use store::SchemaStore;
pub use validate::ConfigValidator;
