//! Workspace orchestration
//!
//! Fans a collect or compare task out across every package of a
//! multi-package workspace:
//! 1. Discover packages through the single matching package-manager handler
//! 2. Run the scorecard command per package, each as its own subprocess in
//!    its own directory
//! 3. Capture per-package failures without aborting the rest of the batch
//! 4. Load the per-package artifacts and merge them into one
//!
//! Merging is structural concatenation: per-package scores stand alone and
//! are never re-aggregated across packages.

pub mod handlers;
pub mod process;

use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::diff::{merge_diffs, ReportsDiff};
use crate::error::MergeError;
use crate::models::Report;
use crate::report::json;
use self::handlers::{HandlerRegistry, PackageHandle};
use self::process::run_process;

/// Default artifact locations relative to each package directory.
const REPORT_PATH: &str = ".scorecard/report.json";
const PREV_REPORT_PATH: &str = ".scorecard/prev-report.json";
const DIFF_PATH: &str = ".scorecard/diff.json";

/// How many packages may run at once.
///
/// Sequential mode is mandatory when packages share a mutable external
/// resource (e.g. one checked-out source tree reused per package); picking
/// the right mode is the caller's call, never auto-detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Sequential,
    /// Bounded only by OS limits (one worker per package)
    Unbounded,
    Bounded(usize),
}

impl Concurrency {
    /// `true` → unbounded, `false` → sequential.
    pub fn from_flag(parallel: bool) -> Self {
        if parallel {
            Concurrency::Unbounded
        } else {
            Concurrency::Sequential
        }
    }

    /// A worker count: 0 or 1 → sequential, n → bounded pool of n.
    pub fn from_count(n: usize) -> Self {
        match n {
            0 | 1 => Concurrency::Sequential,
            n => Concurrency::Bounded(n),
        }
    }

    fn threads(&self, package_count: usize) -> usize {
        match self {
            Concurrency::Sequential => 1,
            Concurrency::Unbounded => package_count.max(1),
            Concurrency::Bounded(n) => (*n).max(1),
        }
    }
}

/// The task fanned out to each package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    Collect,
    Compare,
}

/// Everything one per-package invocation needs, passed explicitly so the
/// orchestration core never reads ambient process state.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub binary: String,
    pub directory: PathBuf,
    pub config_path: Option<PathBuf>,
    pub silent: bool,
}

/// A structured record of one package's failure.
#[derive(Debug, Clone)]
pub struct PackageFailure {
    pub package: String,
    pub error: String,
    /// Captured process output, surfaced even when the run was silent
    pub stdout: String,
    pub stderr: String,
}

/// One package's collected report inside a merged artifact.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub package: String,
    pub report: Report,
}

/// Outcome of one workspace batch.
///
/// `success` is false if any package failed; successful packages' artifacts
/// are present regardless.
#[derive(Debug)]
pub struct BatchOutcome {
    pub success: bool,
    /// Per-package reports, in package order (collect mode)
    pub reports: Vec<PackageReport>,
    /// Merged diff (compare mode)
    pub diff: Option<ReportsDiff>,
    pub failures: Vec<PackageFailure>,
}

enum PackageArtifact {
    Report(Box<Report>),
    Diff(Box<ReportsDiff>),
}

/// Runs collection or comparison across workspace packages and merges the
/// per-package artifacts.
pub struct WorkspaceOrchestrator {
    registry: HandlerRegistry,
    concurrency: Concurrency,
    silent: bool,
    config_path: Option<PathBuf>,
}

impl WorkspaceOrchestrator {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            concurrency: Concurrency::default(),
            silent: false,
            config_path: None,
        }
    }

    /// Set the concurrency policy.
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Suppress per-package process output on success.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Explicit config path forwarded to every package invocation.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Discover workspace packages through the single matching handler.
    ///
    /// Zero or multiple matching handlers is a fatal configuration error,
    /// raised before any package runs.
    pub fn discover(&self, root: &Path) -> Result<Vec<PackageHandle>> {
        let handler = self.registry.select(root)?;
        info!("Using {} package manager handler", handler.name());
        let packages = handler.list_packages(root)?;
        info!("Discovered {} workspace packages", packages.len());
        Ok(packages)
    }

    /// Run the task for every package and merge the results.
    pub fn run(&self, packages: &[PackageHandle], mode: TaskMode) -> Result<BatchOutcome> {
        info!(
            "Running {:?} across {} packages ({:?})",
            mode,
            packages.len(),
            self.concurrency
        );

        let results: Vec<Result<PackageArtifact, PackageFailure>> = match self.concurrency {
            Concurrency::Sequential => packages
                .iter()
                .map(|pkg| self.run_package(pkg, mode))
                .collect(),
            _ => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.concurrency.threads(packages.len()))
                    .build()?;
                pool.install(|| {
                    packages
                        .par_iter()
                        .map(|pkg| self.run_package(pkg, mode))
                        .collect()
                })
            }
        };

        let mut reports = Vec::new();
        let mut diffs = Vec::new();
        let mut failures = Vec::new();
        for (pkg, result) in packages.iter().zip(results) {
            match result {
                Ok(PackageArtifact::Report(report)) => reports.push(PackageReport {
                    package: pkg.name.clone(),
                    report: *report,
                }),
                Ok(PackageArtifact::Diff(mut diff)) => {
                    if diff.label.is_none() {
                        diff.label = Some(pkg.name.clone());
                    }
                    diffs.push(*diff);
                }
                Err(failure) => {
                    warn!("Package {} failed: {}", failure.package, failure.error);
                    failures.push(failure);
                }
            }
        }

        let diff = match mode {
            TaskMode::Compare => Some(merge_diffs(diffs)),
            TaskMode::Collect => None,
        };

        info!(
            "Batch finished: {} succeeded, {} failed",
            packages.len() - failures.len(),
            failures.len()
        );

        Ok(BatchOutcome {
            success: failures.is_empty(),
            reports,
            diff,
            failures,
        })
    }

    /// Run one package's subprocess and load its artifact.
    fn run_package(
        &self,
        pkg: &PackageHandle,
        mode: TaskMode,
    ) -> Result<PackageArtifact, PackageFailure> {
        let ctx = CommandContext {
            binary: pkg.binary.clone(),
            directory: pkg.directory.clone(),
            config_path: self.config_path.clone(),
            silent: self.silent,
        };

        let artifact_path = match mode {
            TaskMode::Collect => REPORT_PATH,
            TaskMode::Compare => DIFF_PATH,
        };
        let args = build_args(&ctx, mode, &pkg.name, artifact_path);

        let output = run_process(&ctx.binary, &args, &ctx.directory);
        if !output.success {
            return Err(PackageFailure {
                package: pkg.name.clone(),
                error: output.failure_reason(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        if !ctx.silent && !output.stdout.is_empty() {
            info!("[{}] {}", pkg.name, output.stdout.trim());
        }

        let path = ctx.directory.join(artifact_path);
        if !path.is_file() {
            // Exit 0 without the promised artifact is still a failure
            return Err(PackageFailure {
                package: pkg.name.clone(),
                error: MergeError::MissingArtifact {
                    package: pkg.name.clone(),
                    path: path.clone(),
                }
                .to_string(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        let load = |path: &Path| match mode {
            TaskMode::Collect => json::load::<Report>(path)
                .map(Box::new)
                .map(PackageArtifact::Report),
            TaskMode::Compare => json::load::<ReportsDiff>(path)
                .map(Box::new)
                .map(PackageArtifact::Diff),
        };
        load(&path).map_err(|e| PackageFailure {
            package: pkg.name.clone(),
            error: e.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Build the per-package command line.
fn build_args(ctx: &CommandContext, mode: TaskMode, package: &str, artifact: &str) -> Vec<String> {
    let mut args = match mode {
        TaskMode::Collect => vec!["collect".to_string()],
        TaskMode::Compare => vec![
            "compare".to_string(),
            PREV_REPORT_PATH.to_string(),
            REPORT_PATH.to_string(),
            "--label".to_string(),
            package.to_string(),
        ],
    };
    args.push("--output".to_string());
    args.push(artifact.to_string());
    if let Some(ref config) = ctx.config_path {
        args.push("--config".to_string());
        args.push(config.to_string_lossy().to_string());
    }
    if ctx.silent {
        args.push("--silent".to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_policy_mapping() {
        assert_eq!(Concurrency::from_flag(false), Concurrency::Sequential);
        assert_eq!(Concurrency::from_flag(true), Concurrency::Unbounded);
        assert_eq!(Concurrency::from_count(0), Concurrency::Sequential);
        assert_eq!(Concurrency::from_count(1), Concurrency::Sequential);
        assert_eq!(Concurrency::from_count(4), Concurrency::Bounded(4));
    }

    #[test]
    fn test_concurrency_thread_counts() {
        assert_eq!(Concurrency::Sequential.threads(10), 1);
        assert_eq!(Concurrency::Unbounded.threads(10), 10);
        assert_eq!(Concurrency::Unbounded.threads(0), 1);
        assert_eq!(Concurrency::Bounded(3).threads(10), 3);
    }

    #[test]
    fn test_build_args_collect() {
        let ctx = CommandContext {
            binary: "scorecard".to_string(),
            directory: PathBuf::from("/repo/pkg"),
            config_path: Some(PathBuf::from("scorecard.toml")),
            silent: true,
        };
        let args = build_args(&ctx, TaskMode::Collect, "api", REPORT_PATH);
        assert_eq!(
            args,
            vec![
                "collect",
                "--output",
                ".scorecard/report.json",
                "--config",
                "scorecard.toml",
                "--silent"
            ]
        );
    }

    #[test]
    fn test_build_args_compare_labels_package() {
        let ctx = CommandContext {
            binary: "scorecard".to_string(),
            directory: PathBuf::from("/repo/pkg"),
            config_path: None,
            silent: false,
        };
        let args = build_args(&ctx, TaskMode::Compare, "api", DIFF_PATH);
        assert!(args.contains(&"--label".to_string()));
        assert!(args.contains(&"api".to_string()));
        assert_eq!(args[0], "compare");
    }
}
