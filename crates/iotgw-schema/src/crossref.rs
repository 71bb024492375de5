//! # Cross-Reference Checks
//!
//! The grammar cannot say that `bridges.<id>.from` / `.to` must name an
//! entry of `connectors`. This module does.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::report::{sort_findings, Finding, PathSegment};

/// Bridge fields that must reference a connector id.
pub const ENDPOINT_FIELDS: [&str; 2] = ["from", "to"];

/// Verify every bridge endpoint names a declared connector.
///
/// A missing or null `connectors`/`bridges` counts as empty. A container of
/// any other non-mapping type yields one finding and ends the check.
pub fn check_cross_references(document: &Map<String, Value>) -> Vec<Finding> {
    let empty = Map::new();

    let connectors = match document.get("connectors") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return vec![Finding::cross_reference(
                vec![PathSegment::from("connectors")],
                "must be an object (map of id → connector)",
            )]
        }
    };
    let bridges = match document.get("bridges") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return vec![Finding::cross_reference(
                vec![PathSegment::from("bridges")],
                "must be an object (map of id → bridge)",
            )]
        }
    };

    let known: BTreeSet<&str> = connectors.keys().map(String::as_str).collect();
    let mut findings = Vec::new();

    for (bridge_id, bridge) in bridges {
        let Value::Object(bridge) = bridge else {
            findings.push(Finding::cross_reference(
                vec![PathSegment::from("bridges"), PathSegment::from(bridge_id.as_str())],
                "each bridge must be an object",
            ));
            continue;
        };
        for field in ENDPOINT_FIELDS {
            let target = bridge.get(field);
            let resolved = matches!(target, Some(Value::String(id)) if known.contains(id.as_str()));
            if !resolved {
                findings.push(Finding::cross_reference(
                    vec![
                        PathSegment::from("bridges"),
                        PathSegment::from(bridge_id.as_str()),
                        PathSegment::from(field),
                    ],
                    format!("unknown connector id '{}'", describe(target)),
                ));
            }
        }
    }

    sort_findings(&mut findings);
    tracing::debug!(
        bridges = bridges.len(),
        connectors = known.len(),
        unresolved = findings.len(),
        "cross-reference check finished"
    );
    findings
}

fn describe(target: Option<&Value>) -> String {
    match target {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
