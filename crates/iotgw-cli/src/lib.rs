//! # iotgw-cli — Gateway Configuration Validator
//!
//! Provides the `iotgw-validate` command. It decides process-level policy
//! (argument parsing, output rendering, exit codes) around the
//! [`iotgw_schema`] pipeline.
//!
//! ```bash
//! iotgw-validate config.yaml
//! iotgw-validate --fragment modbus-rtu protocols/modbus_rtu.yaml
//! iotgw-validate --protocols-dir meta-iotgw/recipes-iotgw/iotgwd/files/protocols
//! iotgw-validate --print-merged --format json /etc/iotgw/iotgw.yaml
//! ```
//!
//! Exit codes: 0 clean, 1 findings reported, 2 fatal error.

pub mod validate;

use std::path::{Path, PathBuf};

/// Location of the gateway grammar relative to the repository root.
pub const DEFAULT_SCHEMA_RELATIVE: &str = "meta-iotgw/recipes-iotgw/iotgwd/files/iotgw.schema.json";

/// Walk up from `start` to the first directory containing
/// [`DEFAULT_SCHEMA_RELATIVE`].
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(DEFAULT_SCHEMA_RELATIVE).is_file())
        .map(Path::to_path_buf)
}

/// Walk up from the current directory to find the repository root.
pub fn resolve_repo_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_repo_root(&cwd)
}
