//! Merge-diffs command - combine per-package diffs into one artifact

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crate::diff::{merge_diffs, ReportsDiff};
use crate::report::json;

use super::collect::resolve_output;

const DEFAULT_OUTPUT: &str = ".scorecard/merged-diff.json";

pub(crate) fn run(
    directory: &Path,
    inputs: &[std::path::PathBuf],
    output: Option<&Path>,
    silent: bool,
) -> Result<()> {
    let directory = directory
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", directory.display()))?;

    let diffs: Vec<ReportsDiff> = inputs
        .iter()
        .map(|path| json::load(&directory.join(path)))
        .collect::<Result<_>>()?;

    let merged = merge_diffs(diffs);

    let output_path = resolve_output(&directory, output, DEFAULT_OUTPUT);
    json::save(&merged, &output_path)?;
    info!("Merged {} diffs into {:?}", inputs.len(), output_path);

    if !silent {
        println!(
            "{} Merged {} diffs ({} audit changes) {} {}",
            style("✓").green(),
            inputs.len(),
            merged.audits.changed.len(),
            style("→").dim(),
            style(output_path.display()).cyan()
        );
    }

    Ok(())
}
