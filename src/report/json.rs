//! JSON artifact persistence
//!
//! Reports and diffs are durable JSON artifacts; this module is the single
//! place they get rendered, saved, and loaded. Pretty output is the default
//! so artifacts stay diffable in version control.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Render an artifact as pretty-printed JSON.
pub fn render<T: Serialize>(artifact: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(artifact)?)
}

/// Render an artifact as compact JSON (single line).
pub fn render_compact<T: Serialize>(artifact: &T) -> Result<String> {
    Ok(serde_json::to_string(artifact)?)
}

/// Write an artifact to disk, creating parent directories as needed.
pub fn save<T: Serialize>(artifact: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating artifact directory {parent:?}"))?;
    }
    std::fs::write(path, render(artifact)?)
        .with_context(|| format!("writing artifact {path:?}"))?;
    Ok(())
}

/// Load an artifact from disk.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading artifact {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing artifact {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditResult, PluginRunResult, Report};
    use chrono::Utc;

    fn sample_report() -> Report {
        Report {
            package_name: "api".to_string(),
            version: "1.0.0".to_string(),
            commit: Some("abc123".to_string()),
            date: Utc::now(),
            duration_ms: 42,
            plugins: vec![PluginRunResult {
                slug: "coverage".to_string(),
                title: "Coverage".to_string(),
                groups: vec![],
                audits: vec![AuditResult::new("line-coverage", 87.5, 0.875)],
                date: Utc::now(),
                duration_ms: 40,
            }],
            categories: vec![],
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".scorecard/report.json");

        let report = sample_report();
        save(&report, &path).unwrap();
        let loaded: Report = load(&path).unwrap();

        assert_eq!(loaded.package_name, report.package_name);
        let audit = loaded.audit("coverage", "line-coverage").unwrap();
        assert_eq!((audit.value, audit.score), (87.5, 0.875));
    }

    #[test]
    fn test_render_is_valid_camel_case_json() {
        let json = render(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["packageName"], "api");
        assert!(value["plugins"][0]["audits"][0]["displayValue"].is_null());
    }

    #[test]
    fn test_render_compact_single_line() {
        let json = render_compact(&sample_report()).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load::<Report>(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(err.to_string().contains("report.json"));
    }
}
