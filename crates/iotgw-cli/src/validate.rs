//! # Validate Command
//!
//! Full-document validation (includes merged, schema plus cross-reference
//! checks), single-fragment validation and protocol template batches.
//!
//! Rendering and exit codes live here; the pipeline itself only returns
//! findings or a fatal [`ConfigError`](iotgw_schema::ConfigError).

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::{json, Value};

use iotgw_schema::{
    assemble, assemble_fragment, check_document, check_fragment, validate_protocol_dir,
    ConfigValidator, Document, FragmentBatchReport, FragmentProblem, Report, YamlFileLoader,
};

/// Everything validated cleanly.
pub const EXIT_CLEAN: u8 = 0;
/// One or more findings were reported.
pub const EXIT_FINDINGS: u8 = 1;
/// A fatal load, merge or schema error stopped the run.
pub const EXIT_FATAL: u8 = 2;

/// How reports are written to stdout.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Line-oriented, human readable.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Arguments for `iotgw-validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Configuration file to validate (or a fragment with --fragment).
    #[arg(
        value_name = "PATH",
        required_unless_present = "protocols_dir",
        conflicts_with = "protocols_dir"
    )]
    pub path: Option<PathBuf>,

    /// Root schema. Defaults to the grammar shipped in the repository.
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Validate PATH as a fragment of the given protocol type (e.g. mqtt, modbus-rtu).
    #[arg(long, value_name = "TYPE", conflicts_with = "protocols_dir")]
    pub fragment: Option<String>,

    /// Validate every template in DIR, deriving the protocol type from each file name.
    #[arg(long, value_name = "DIR")]
    pub protocols_dir: Option<PathBuf>,

    /// Print the assembled document before validating it.
    #[arg(long)]
    pub print_merged: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the command, writing to stdout.
///
/// Returns exit code: 0 when clean, 1 when findings were reported. Fatal
/// problems come back as `Err` and map to exit code 2 in `main`.
pub fn run_validate(args: &ValidateArgs, repo_root: &Path) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_validate_to(args, repo_root, &mut out)
}

/// [`run_validate`] writing to an arbitrary sink.
pub fn run_validate_to(args: &ValidateArgs, repo_root: &Path, out: &mut dyn Write) -> Result<u8> {
    let schema_path = args
        .schema
        .clone()
        .unwrap_or_else(|| repo_root.join(crate::DEFAULT_SCHEMA_RELATIVE));
    let validator = ConfigValidator::from_schema_path(&schema_path)
        .with_context(|| format!("failed to load schema {}", schema_path.display()))?;

    tracing::info!(
        schema = %schema_path.display(),
        documents = validator.store().document_count(),
        aliases = validator.store().alias_count(),
        "loaded gateway grammar"
    );

    if let Some(ref dir) = args.protocols_dir {
        let batch = validate_protocol_dir(dir, &validator)
            .with_context(|| format!("failed to list protocol templates in {}", dir.display()))?;
        write_batch(out, &batch, args.format)?;
        return Ok(if batch.is_clean() { EXIT_CLEAN } else { EXIT_FINDINGS });
    }

    let Some(ref path) = args.path else {
        anyhow::bail!("no configuration path given");
    };
    let loader = YamlFileLoader;

    let (document, success) = match args.fragment {
        Some(ref protocol) => {
            let wrapped = assemble_fragment(path, protocol, &loader)
                .with_context(|| format!("failed to load fragment {}", path.display()))?;
            (wrapped, format!("✓ Fragment valid ({protocol}): {}", path.display()))
        }
        None => {
            let merged = assemble(path, &loader)
                .with_context(|| format!("failed to assemble {}", path.display()))?;
            (merged, format!("✓ Config valid: {}", path.display()))
        }
    };

    let merged = args.print_merged.then(|| document.clone());
    let report = match args.fragment {
        Some(_) => check_fragment(document, &validator),
        None => check_document(document, &validator),
    };

    match args.format {
        OutputFormat::Text => {
            if let Some(ref merged) = merged {
                write_merged_yaml(out, merged)?;
            }
            write_report_text(out, &report, &success)?;
        }
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&report)?;
            if let (Some(merged), Value::Object(map)) = (merged, &mut value) {
                map.insert("merged".to_string(), Value::Object(merged));
            }
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }

    Ok(if report.is_clean() { EXIT_CLEAN } else { EXIT_FINDINGS })
}

fn write_merged_yaml(out: &mut dyn Write, document: &Document) -> Result<()> {
    let yaml = serde_yaml::to_string(document).context("failed to render merged document")?;
    writeln!(out, "# merged configuration")?;
    write!(out, "{yaml}")?;
    writeln!(out, "---")?;
    Ok(())
}

fn write_report_text(out: &mut dyn Write, report: &Report, success: &str) -> Result<()> {
    if report.is_clean() {
        writeln!(out, "{success}")?;
        return Ok(());
    }
    writeln!(out, "Validation FAILED:")?;
    for line in report.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_batch(out: &mut dyn Write, batch: &FragmentBatchReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Protocol templates: {}/{} passed", batch.passed, batch.total)?;
            for failure in &batch.failures {
                writeln!(
                    out,
                    "  FAIL: {} ({})",
                    failure.path.display(),
                    failure.protocol
                )?;
                match failure.problem {
                    FragmentProblem::Findings(ref report) => {
                        for line in report.lines() {
                            writeln!(out, "    {line}")?;
                        }
                    }
                    FragmentProblem::Fatal(ref err) => writeln!(out, "    ERR: {err}")?,
                }
            }
        }
        OutputFormat::Json => {
            let failures: Vec<Value> = batch
                .failures
                .iter()
                .map(|failure| {
                    let mut entry = json!({
                        "path": failure.path.display().to_string(),
                        "protocol": failure.protocol,
                    });
                    match failure.problem {
                        FragmentProblem::Findings(ref report) => {
                            entry["findings"] = json!(report.findings());
                        }
                        FragmentProblem::Fatal(ref err) => {
                            entry["error"] = json!(err.to_string());
                        }
                    }
                    entry
                })
                .collect();
            let value = json!({
                "total": batch.total,
                "passed": batch.passed,
                "failures": failures,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }
    Ok(())
}
