//! Compare command - diff two collected reports

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crate::diff::{self, DiffOptions, ReportsDiff};
use crate::models::Report;
use crate::report::json;

use super::collect::resolve_output;

/// Default diff location relative to the package directory.
const DEFAULT_OUTPUT: &str = ".scorecard/diff.json";

#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    directory: &Path,
    before: &Path,
    after: &Path,
    output: Option<&Path>,
    label: Option<String>,
    ignore_display_value: bool,
    silent: bool,
) -> Result<()> {
    let directory = directory
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", directory.display()))?;

    let before_report: Report = json::load(&directory.join(before))?;
    let after_report: Report = json::load(&directory.join(after))?;

    let mut opts = DiffOptions::default();
    if ignore_display_value {
        opts = opts.ignore_display_value();
    }

    let mut result = diff::diff(&before_report, &after_report, &opts)?;
    result.label = label;

    let output_path = resolve_output(&directory, output, DEFAULT_OUTPUT);
    json::save(&result, &output_path)?;
    info!("Diff written to {:?}", output_path);

    if !silent {
        print_summary(&result);
        println!(
            "  {} {}",
            style("→").dim(),
            style(output_path.display()).cyan()
        );
    }

    Ok(())
}

fn print_summary(diff: &ReportsDiff) {
    if !diff.has_changes() {
        println!("{} No changes", style("✓").green());
        return;
    }
    println!(
        "{} {} audits changed, {} added, {} removed ({} unchanged)",
        style("Δ").yellow().bold(),
        diff.audits.changed.len(),
        diff.audits.added.len(),
        diff.audits.removed.len(),
        diff.audits.unchanged.len()
    );
    for change in &diff.categories.changed {
        let arrow = match change.score_delta {
            Some(d) if d > 0.0 => style("↑").green(),
            Some(_) => style("↓").red(),
            None => style("~").dim(),
        };
        println!(
            "  {} {} {} → {}",
            arrow,
            change.identity.title,
            render_score(change.before),
            render_score(change.after)
        );
    }
}

fn render_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.0}", s * 100.0),
        None => "-".to_string(),
    }
}
