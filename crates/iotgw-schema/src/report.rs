//! # Findings and Reports
//!
//! Reported (non-fatal) problems. Every finding carries the path from the
//! document root to the offending node and a message. Reports are sorted
//! explicitly so output never depends on evaluation order.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One step in a path from the document root.
///
/// Indices order before keys; within a variant, natural ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Position in a sequence.
    Index(usize),
    /// Key in a mapping.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Structural violation reported by the schema.
    Schema,
    /// Bridge endpoint that does not name a connector.
    CrossReference,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Which check produced this.
    pub kind: FindingKind,
    /// Path from the document root to the offending node.
    pub path: Vec<PathSegment>,
    /// Human-readable description.
    pub message: String,
}

impl Finding {
    /// A schema finding.
    pub fn schema(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            kind: FindingKind::Schema,
            path,
            message: message.into(),
        }
    }

    /// A cross-reference finding.
    pub fn cross_reference(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            kind: FindingKind::CrossReference,
            path,
            message: message.into(),
        }
    }

    /// The path as a JSON Pointer (`/` for the root).
    pub fn pointer(&self) -> String {
        if self.path.is_empty() {
            return "/".to_string();
        }
        self.path
            .iter()
            .map(|s| format!("/{}", escape_pointer_token(&s.to_string())))
            .collect()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FindingKind::Schema => write!(f, "[schema] {}: {}", self.pointer(), self.message),
            FindingKind::CrossReference => {
                let joined: Vec<String> = self.path.iter().map(ToString::to_string).collect();
                write!(f, "[{}] {}", joined.join("/"), self.message)
            }
        }
    }
}

/// Sort findings by path components, then message.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
}

/// Ordered outcome of one validation run.
///
/// Schema findings always precede cross-reference findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    /// Assemble a report from the two finding sets, sorting each.
    pub fn new(mut schema: Vec<Finding>, mut cross_reference: Vec<Finding>) -> Self {
        sort_findings(&mut schema);
        sort_findings(&mut cross_reference);
        schema.append(&mut cross_reference);
        Self { findings: schema }
    }

    /// True when nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// True when there are no findings.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// All findings in report order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings of one kind, in report order.
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// One rendered line per finding.
    pub fn lines(&self) -> Vec<String> {
        self.findings.iter().map(ToString::to_string).collect()
    }

    /// Consume the report, returning its findings.
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{finding}")?;
        }
        Ok(())
    }
}

/// Turn a JSON Pointer into path segments, deciding index vs key by
/// walking `instance`: a token is an index only where the node it
/// addresses is a sequence.
pub fn segments_from_pointer(pointer: &str, instance: &Value) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut cursor = Some(instance);
    for raw in pointer.split('/').skip(1) {
        let token = unescape_pointer_token(raw);
        let segment = match (cursor, token.parse::<usize>()) {
            (Some(Value::Array(_)), Ok(index)) => PathSegment::Index(index),
            _ => PathSegment::Key(token),
        };
        cursor = match (&segment, cursor) {
            (PathSegment::Index(i), Some(Value::Array(items))) => items.get(*i),
            (PathSegment::Key(k), Some(Value::Object(map))) => map.get(k),
            _ => None,
        };
        segments.push(segment);
    }
    segments
}

fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::from(k)
    }

    #[test]
    fn pointer_segments_follow_instance_shape() {
        let instance = json!({
            "connectors": {"0": {"params": {"topics": [{"qos": 3}]}}}
        });
        let segs = segments_from_pointer("/connectors/0/params/topics/0/qos", &instance);
        assert_eq!(
            segs,
            vec![
                key("connectors"),
                key("0"),
                key("params"),
                key("topics"),
                PathSegment::Index(0),
                key("qos"),
            ]
        );
    }

    #[test]
    fn pointer_tokens_are_unescaped() {
        let instance = json!({"a/b": {"c~d": 1}});
        let segs = segments_from_pointer("/a~1b/c~0d", &instance);
        assert_eq!(segs, vec![key("a/b"), key("c~d")]);
        let finding = Finding::schema(segs, "x");
        assert_eq!(finding.pointer(), "/a~1b/c~0d");
    }

    #[test]
    fn empty_pointer_is_root() {
        assert!(segments_from_pointer("", &json!({})).is_empty());
        assert_eq!(Finding::schema(vec![], "m").pointer(), "/");
    }

    #[test]
    fn report_orders_by_path_then_message() {
        let schema = vec![
            Finding::schema(vec![key("gateway")], "b"),
            Finding::schema(vec![key("connectors"), key("s2")], "z"),
            Finding::schema(vec![key("gateway")], "a"),
            Finding::schema(vec![], "root"),
        ];
        let xref = vec![
            Finding::cross_reference(vec![key("bridges"), key("b2"), key("to")], "m"),
            Finding::cross_reference(vec![key("bridges"), key("b1"), key("to")], "m"),
        ];
        let report = Report::new(schema, xref);
        let lines = report.lines();
        assert_eq!(
            lines,
            vec![
                "[schema] /: root",
                "[schema] /connectors/s2: z",
                "[schema] /gateway: a",
                "[schema] /gateway: b",
                "[bridges/b1/to] m",
                "[bridges/b2/to] m",
            ]
        );
        assert_eq!(report.of_kind(FindingKind::CrossReference).count(), 2);
    }

    #[test]
    fn indices_sort_numerically_before_keys() {
        let mut findings = vec![
            Finding::schema(vec![key("t"), PathSegment::Index(10)], "m"),
            Finding::schema(vec![key("t"), key("x")], "m"),
            Finding::schema(vec![key("t"), PathSegment::Index(2)], "m"),
        ];
        sort_findings(&mut findings);
        assert_eq!(findings[0].path[1], PathSegment::Index(2));
        assert_eq!(findings[1].path[1], PathSegment::Index(10));
        assert_eq!(findings[2].path[1], key("x"));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = Report::new(
            vec![Finding::schema(vec![key("a"), PathSegment::Index(1)], "bad")],
            vec![],
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({"findings": [{"kind": "schema", "path": ["a", 1], "message": "bad"}]})
        );
    }

    #[test]
    fn clean_report() {
        let report = Report::default();
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "");
    }
}
