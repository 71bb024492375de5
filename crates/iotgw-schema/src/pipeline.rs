//! # Validation Pipeline
//!
//! Wires the stages together for the two document shapes:
//!
//! - full configuration: load → merge includes → schema + cross-reference
//! - protocol fragment: load → wrap → schema
//!
//! Each stage finishes before the next starts. A [`ConfigError`] from any
//! stage ends the run; findings are accumulated into a [`Report`].

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::crossref::check_cross_references;
use crate::error::ConfigError;
use crate::fragment::{protocol_from_stem, wrap_fragment};
use crate::loader::{into_document, Document, DocumentLoader, YamlFileLoader};
use crate::merge::merge_includes;
use crate::report::Report;
use crate::validate::ConfigValidator;

/// Load the document at `path` and fold in its includes.
pub fn assemble(path: &Path, loader: &dyn DocumentLoader) -> Result<Document, ConfigError> {
    let root = into_document(loader.load(path)?, path)?;
    let merged = merge_includes(root, path, loader)?;
    tracing::info!(
        path = %path.display(),
        connectors = collection_len(&merged, "connectors"),
        bridges = collection_len(&merged, "bridges"),
        "assembled configuration"
    );
    Ok(merged)
}

/// Schema and cross-reference findings for an already assembled document.
pub fn check_document(document: Document, validator: &ConfigValidator) -> Report {
    let cross_reference = check_cross_references(&document);
    let schema = validator.validate(&Value::Object(document));
    Report::new(schema, cross_reference)
}

/// Validate the full configuration at `path`.
///
/// # Errors
///
/// Returns the first fatal problem met while loading or merging.
/// Schema and cross-reference problems are in the returned [`Report`].
pub fn validate_config(
    path: &Path,
    validator: &ConfigValidator,
    loader: &dyn DocumentLoader,
) -> Result<Report, ConfigError> {
    let document = assemble(path, loader)?;
    let report = check_document(document, validator);
    tracing::info!(path = %path.display(), findings = report.len(), "validated configuration");
    Ok(report)
}

/// Load the fragment at `path` and wrap it as a `protocol` connector.
pub fn assemble_fragment(
    path: &Path,
    protocol: &str,
    loader: &dyn DocumentLoader,
) -> Result<Document, ConfigError> {
    Ok(wrap_fragment(loader.load(path)?, protocol))
}

/// Schema findings for an already wrapped fragment.
pub fn check_fragment(wrapped: Document, validator: &ConfigValidator) -> Report {
    Report::new(validator.validate(&Value::Object(wrapped)), Vec::new())
}

/// Validate the protocol fragment at `path`, declared as `protocol`.
///
/// Cross-reference checks do not run in this mode.
pub fn validate_fragment(
    path: &Path,
    protocol: &str,
    validator: &ConfigValidator,
    loader: &dyn DocumentLoader,
) -> Result<Report, ConfigError> {
    let wrapped = assemble_fragment(path, protocol, loader)?;
    let report = check_fragment(wrapped, validator);
    tracing::info!(
        path = %path.display(),
        protocol,
        findings = report.len(),
        "validated fragment"
    );
    Ok(report)
}

/// Why one template in a batch did not pass.
#[derive(Debug)]
pub enum FragmentProblem {
    /// The fragment loaded but the grammar rejected it.
    Findings(Report),
    /// The fragment could not be loaded.
    Fatal(ConfigError),
}

/// A template that did not pass.
#[derive(Debug)]
pub struct FragmentFailure {
    /// File that was checked.
    pub path: PathBuf,
    /// Protocol type derived from the file stem.
    pub protocol: String,
    /// What went wrong.
    pub problem: FragmentProblem,
}

/// Outcome of validating a directory of protocol templates.
#[derive(Debug, Default)]
pub struct FragmentBatchReport {
    /// Number of template files found.
    pub total: usize,
    /// Number that validated cleanly.
    pub passed: usize,
    /// Everything else, in file order.
    pub failures: Vec<FragmentFailure>,
}

impl FragmentBatchReport {
    /// True when every template passed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate every `*.yaml` / `*.yml` file in `dir` as a fragment whose
/// protocol type comes from the file stem (`modbus_rtu.yaml` → `modbus-rtu`).
///
/// Files are processed in sorted order. A file that cannot be loaded is
/// recorded as that file's failure; the batch continues.
///
/// # Errors
///
/// Only when `dir` itself cannot be listed.
pub fn validate_protocol_dir(
    dir: &Path,
    validator: &ConfigValidator,
) -> Result<FragmentBatchReport, ConfigError> {
    let read_err = |source| ConfigError::DocumentRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let loader = YamlFileLoader;
    let mut batch = FragmentBatchReport {
        total: files.len(),
        ..FragmentBatchReport::default()
    };

    for path in files {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let protocol = protocol_from_stem(stem);
        let problem = match validate_fragment(&path, &protocol, validator, &loader) {
            Ok(report) if report.is_clean() => {
                batch.passed += 1;
                continue;
            }
            Ok(report) => FragmentProblem::Findings(report),
            Err(err) => FragmentProblem::Fatal(err),
        };
        tracing::debug!(path = %path.display(), protocol = %protocol, "template failed");
        batch.failures.push(FragmentFailure {
            path,
            protocol,
            problem,
        });
    }

    tracing::info!(
        dir = %dir.display(),
        total = batch.total,
        passed = batch.passed,
        "validated protocol templates"
    );
    Ok(batch)
}

fn collection_len(document: &Document, key: &str) -> usize {
    document
        .get(key)
        .and_then(Value::as_object)
        .map_or(0, |m| m.len())
}
