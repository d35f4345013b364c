//! Core data models for Scorecard
//!
//! These models are used throughout the codebase for representing
//! plugin declarations, audit results, and collected reports.
//!
//! Declared entities (`Audit`, `Group`, `Category`) are static per
//! configuration load; runtime entities (`AuditResult`, `PluginRunResult`,
//! `Report`) are created fresh each collection run and are write-once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scorable check declared by a plugin, identified by a stable slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    /// Unique within the declaring plugin
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
}

impl Audit {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            description: None,
            docs_url: None,
        }
    }
}

/// Structured payloads attached to an audit result.
///
/// The contents stay opaque JSON; rendering them into tables or trees is a
/// downstream concern the core never interprets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trees: Option<serde_json::Value>,
}

/// The runtime output of one audit for one run.
///
/// `slug` must match an audit declared by the producing plugin; `title` is
/// filled in from the declaration when the runner normalizes raw output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    pub value: f64,
    /// Normalized score in `[0, 1]`
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AuditDetails>,
}

impl AuditResult {
    pub fn new(slug: impl Into<String>, value: f64, score: f64) -> Self {
        Self {
            slug: slug.into(),
            title: String::new(),
            value,
            score,
            display_value: None,
            details: None,
        }
    }

    /// Set the human-readable display value.
    pub fn with_display_value(mut self, display: impl Into<String>) -> Self {
        self.display_value = Some(display.into());
        self
    }
}

/// A weighted reference from a group to an audit of the same plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub slug: String,
    /// Non-negative; zero means "listed but not scored"
    pub weight: f64,
}

/// A named, weighted collection of audits within one plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub slug: String,
    pub title: String,
    pub refs: Vec<GroupRef>,
}

/// Whether a category ref points at a plugin audit or a plugin group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryRefKind {
    Audit,
    Group,
}

impl std::fmt::Display for CategoryRefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryRefKind::Audit => write!(f, "audit"),
            CategoryRefKind::Group => write!(f, "group"),
        }
    }
}

/// A weighted, cross-plugin reference inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    #[serde(rename = "type")]
    pub kind: CategoryRefKind,
    pub plugin: String,
    pub slug: String,
    pub weight: f64,
}

/// A cross-plugin weighted rollup over audits and/or groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub slug: String,
    pub title: String,
    pub refs: Vec<CategoryRef>,
}

/// One plugin's contribution to a report: declared metadata plus the
/// normalized results and timing of a single execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRunResult {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    pub audits: Vec<AuditResult>,
    pub date: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PluginRunResult {
    /// Look up a result by audit slug.
    pub fn audit(&self, slug: &str) -> Option<&AuditResult> {
        self.audits.iter().find(|a| a.slug == slug)
    }

    /// Look up a declared group by slug.
    pub fn group(&self, slug: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.slug == slug)
    }
}

/// The full persisted outcome of one collection run.
///
/// Write-once: this is the durable artifact downstream tooling (the compare
/// command, status reporting, merge) consumes. Never mutated after assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub package_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub date: DateTime<Utc>,
    pub duration_ms: u64,
    pub plugins: Vec<PluginRunResult>,
    pub categories: Vec<Category>,
}

impl Report {
    /// Look up a plugin run by slug.
    pub fn plugin(&self, slug: &str) -> Option<&PluginRunResult> {
        self.plugins.iter().find(|p| p.slug == slug)
    }

    /// Look up an audit result by (plugin slug, audit slug).
    pub fn audit(&self, plugin: &str, slug: &str) -> Option<&AuditResult> {
        self.plugin(plugin).and_then(|p| p.audit(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_result_builder() {
        let result = AuditResult::new("lcov", 42.0, 0.42).with_display_value("42 %");
        assert_eq!(result.slug, "lcov");
        assert_eq!(result.display_value.as_deref(), Some("42 %"));
        assert!(result.details.is_none());
    }

    #[test]
    fn test_category_ref_wire_format() {
        let cref = CategoryRef {
            kind: CategoryRefKind::Group,
            plugin: "coverage".to_string(),
            slug: "unit-tests".to_string(),
            weight: 2.0,
        };
        let json = serde_json::to_value(&cref).unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["plugin"], "coverage");
    }

    #[test]
    fn test_audit_result_deserializes_without_optional_fields() {
        let raw = r#"{"slug": "no-any", "value": 3.0, "score": 0.5}"#;
        let result: AuditResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.slug, "no-any");
        assert!(result.title.is_empty());
        assert!(result.display_value.is_none());
    }

    #[test]
    fn test_report_lookup_by_slug() {
        let report = Report {
            package_name: "api".to_string(),
            version: "1.0.0".to_string(),
            commit: None,
            date: Utc::now(),
            duration_ms: 10,
            plugins: vec![PluginRunResult {
                slug: "eslint".to_string(),
                title: "ESLint".to_string(),
                groups: vec![],
                audits: vec![AuditResult::new("no-any", 3.0, 0.5)],
                date: Utc::now(),
                duration_ms: 5,
            }],
            categories: vec![],
        };

        assert!(report.plugin("eslint").is_some());
        assert!(report.audit("eslint", "no-any").is_some());
        assert!(report.audit("eslint", "missing").is_none());
        assert!(report.plugin("coverage").is_none());
    }
}
