//! Monorepo command - fan collect or compare out across workspace packages

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::monorepo::handlers::HandlerRegistry;
use crate::monorepo::{Concurrency, TaskMode, WorkspaceOrchestrator};
use crate::report::json;

use super::collect::resolve_output;

const MERGED_REPORTS: &str = ".scorecard/merged-report.json";
const MERGED_DIFF: &str = ".scorecard/merged-diff.json";

#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    root: &Path,
    task: &str,
    parallel: bool,
    workers: Option<usize>,
    output: Option<&Path>,
    config: Option<&Path>,
    silent: bool,
) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", root.display()))?;

    let concurrency = match workers {
        Some(n) => Concurrency::from_count(n),
        None => Concurrency::from_flag(parallel),
    };

    let mut orchestrator =
        WorkspaceOrchestrator::new(HandlerRegistry::with_defaults()).with_concurrency(concurrency);
    orchestrator = orchestrator.with_silent(silent);
    if let Some(config) = config {
        orchestrator = orchestrator.with_config_path(config);
    }

    let packages = orchestrator.discover(&root)?;
    if packages.is_empty() {
        anyhow::bail!("workspace at {} declares no packages", root.display());
    }
    if !silent {
        println!(
            "{} {} workspace packages",
            style("⇶").bold(),
            packages.len()
        );
    }

    let mode = match task {
        "compare" => TaskMode::Compare,
        _ => TaskMode::Collect,
    };
    let outcome = orchestrator.run(&packages, mode)?;

    let output_path = match mode {
        TaskMode::Collect => {
            let path = resolve_output(&root, output, MERGED_REPORTS);
            json::save(&outcome.reports, &path)?;
            path
        }
        TaskMode::Compare => {
            let path = resolve_output(&root, output, MERGED_DIFF);
            if let Some(ref diff) = outcome.diff {
                json::save(diff, &path)?;
            }
            path
        }
    };

    if !silent {
        println!(
            "{} {}/{} packages succeeded {} {}",
            if outcome.success {
                style("✓").green()
            } else {
                style("✗").red()
            },
            packages.len() - outcome.failures.len(),
            packages.len(),
            style("→").dim(),
            style(output_path.display()).cyan()
        );
    }

    if !outcome.success {
        for failure in &outcome.failures {
            eprintln!(
                "{} package {}: {}",
                style("✗").red(),
                style(&failure.package).bold(),
                failure.error
            );
            // Full captured output aids diagnosis, even when --silent was set
            if !failure.stdout.is_empty() {
                eprintln!("  {}", failure.stdout.trim().replace('\n', "\n  "));
            }
            if !failure.stderr.is_empty() {
                eprintln!("  {}", failure.stderr.trim().replace('\n', "\n  "));
            }
        }
        anyhow::bail!(
            "{} of {} packages failed",
            outcome.failures.len(),
            packages.len()
        );
    }

    Ok(())
}
