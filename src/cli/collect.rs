//! Collect command - run every configured plugin and write the report

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::report::json;
use crate::report::{FailureMode, ReportAssembler};
use crate::scoring;

use super::config_file;

/// Default report location relative to the package directory.
const DEFAULT_OUTPUT: &str = ".scorecard/report.json";

#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    directory: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    workers: Option<usize>,
    keep_going: bool,
    silent: bool,
) -> Result<()> {
    let directory = directory
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", directory.display()))?;

    let config_path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| directory.join(config_file::DEFAULT_CONFIG_FILE));
    let file = config_file::load(&config_path)?;

    let package_name = file
        .package
        .clone()
        .unwrap_or_else(|| dir_name(&directory));
    let version = file.version.clone().unwrap_or_else(|| "0.0.0".to_string());
    let total = file.plugins.len();

    let mut assembler = ReportAssembler::new(file.into_core_config(), package_name, version)
        .with_directory(&directory);
    if keep_going {
        assembler = assembler.with_failure_mode(FailureMode::Continue);
    }
    if let Some(workers) = workers {
        assembler = assembler.with_parallel_plugins(workers);
    }

    let bar = progress_bar(total, silent);
    let callback_bar = bar.clone();
    assembler = assembler.with_progress_callback(Box::new(move |slug, done, _| {
        callback_bar.set_position(done as u64);
        callback_bar.set_message(slug.to_string());
    }));

    let outcome = assembler.run()?;
    bar.finish_and_clear();

    let output_path = resolve_output(&directory, output, DEFAULT_OUTPUT);
    json::save(&outcome.report, &output_path)?;
    info!("Report written to {:?}", output_path);

    if !silent {
        println!(
            "\n{} Collected {} plugins in {}ms",
            style("✓").green(),
            outcome.report.plugins.len(),
            outcome.report.duration_ms
        );
        for category in &outcome.report.categories {
            let score = scoring::score_category(category, &outcome.report.plugins);
            let rendered = match score {
                Some(s) => format!("{:>3.0}", s * 100.0),
                None => "  -".to_string(),
            };
            println!("  {} {}", style(rendered).cyan().bold(), category.title);
        }
        println!(
            "  {} {}",
            style("→").dim(),
            style(output_path.display()).cyan()
        );
    }

    if !outcome.all_succeeded() {
        for failure in &outcome.failures {
            eprintln!(
                "{} plugin {}: {}",
                style("✗").red(),
                style(&failure.plugin).bold(),
                failure.error
            );
        }
        anyhow::bail!(
            "{} of {} plugins failed",
            outcome.failures.len(),
            outcome.report.plugins.len() + outcome.failures.len()
        );
    }

    Ok(())
}

fn progress_bar(total: usize, silent: bool) -> ProgressBar {
    if silent {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓▒░  "),
    );
    bar
}

pub(crate) fn resolve_output(directory: &Path, output: Option<&Path>, default: &str) -> PathBuf {
    match output {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => directory.join(path),
        None => directory.join(default),
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "package".to_string())
}
