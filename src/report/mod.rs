//! Report assembly
//!
//! Orchestrates the full collection pipeline for one package:
//! 1. Validate the config (fatal before anything executes)
//! 2. Run each plugin's runner in declared order
//! 3. Normalize and collect per-plugin results
//! 4. Stamp package metadata and timing into one immutable [`Report`]
//!
//! Plugins run sequentially by default; callers can opt into a rayon worker
//! pool when their plugins are independent. Continue-on-failure is a caller
//! choice: in [`FailureMode::Continue`] a failed plugin becomes a recorded
//! [`PluginFailure`] and the rest of the run proceeds.

pub mod json;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::models::Report;
use crate::runner::{self, RunnerContext};

/// Progress callback: (plugin slug, completed, total).
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// What to do when a plugin fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// First failure aborts remaining queued plugins (default)
    #[default]
    Abort,
    /// Record the failure and keep going
    Continue,
}

/// A structured record of one plugin's failure.
#[derive(Debug, Clone)]
pub struct PluginFailure {
    pub plugin: String,
    pub error: String,
}

/// Result of one collection run: the report plus any tolerated failures.
#[derive(Debug)]
pub struct CollectOutcome {
    pub report: Report,
    pub failures: Vec<PluginFailure>,
}

impl CollectOutcome {
    /// Whether every plugin completed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Combines plugin metadata, runner results, and package identity into one
/// immutable report.
pub struct ReportAssembler {
    config: CoreConfig,
    package_name: String,
    version: String,
    commit: Option<String>,
    directory: PathBuf,
    failure_mode: FailureMode,
    /// Run independent plugins on a worker pool (opt-in; command-variant
    /// runners are non-blocking with respect to each other)
    parallel_plugins: bool,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl ReportAssembler {
    pub fn new(
        config: CoreConfig,
        package_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            config,
            package_name: package_name.into(),
            version: version.into(),
            commit: None,
            directory: PathBuf::from("."),
            failure_mode: FailureMode::default(),
            parallel_plugins: false,
            workers: 0,
            progress_callback: None,
        }
    }

    /// Record the commit the collection ran against.
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// Working directory for command runners.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the failure policy.
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Opt into parallel plugin execution (0 workers = auto-detect).
    pub fn with_parallel_plugins(mut self, workers: usize) -> Self {
        self.parallel_plugins = true;
        self.workers = workers;
        self
    }

    /// Set a progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Validate the config, run every plugin, and assemble the report.
    ///
    /// Timing covers plugin execution only, not validation.
    pub fn run(&self) -> Result<CollectOutcome> {
        self.config.validate()?;

        let total = self.config.plugins.len();
        info!(
            "Collecting {} plugins for package {}",
            total, self.package_name
        );

        let date = Utc::now();
        let start = Instant::now();

        let results = if self.parallel_plugins {
            self.run_parallel(total)?
        } else {
            self.run_sequential(total)?
        };

        let mut plugins = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(run) => plugins.push(run),
                Err(failure) => {
                    warn!("Plugin {} failed: {}", failure.plugin, failure.error);
                    failures.push(failure);
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Collection complete: {}/{} plugins in {}ms",
            plugins.len(),
            total,
            duration_ms
        );

        Ok(CollectOutcome {
            report: Report {
                package_name: self.package_name.clone(),
                version: self.version.clone(),
                commit: self.commit.clone(),
                date,
                duration_ms,
                plugins,
                categories: self.config.categories.clone(),
            },
            failures,
        })
    }

    fn run_sequential(
        &self,
        total: usize,
    ) -> Result<Vec<Result<crate::models::PluginRunResult, PluginFailure>>> {
        let mut results = Vec::with_capacity(total);
        for (done, plugin) in self.config.plugins.iter().enumerate() {
            let result = self.run_one(plugin);
            if let Some(ref callback) = self.progress_callback {
                callback(&plugin.slug, done + 1, total);
            }
            let failed = result.is_err();
            results.push(result);
            if failed && self.failure_mode == FailureMode::Abort {
                break;
            }
        }

        self.check_abort(results)
    }

    fn run_parallel(
        &self,
        total: usize,
    ) -> Result<Vec<Result<crate::models::PluginRunResult, PluginFailure>>> {
        let workers = if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            self.workers
        };
        debug!("Running plugins on {} workers", workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;

        let completed = AtomicUsize::new(0);
        let results: Vec<_> = pool.install(|| {
            self.config
                .plugins
                .par_iter()
                .map(|plugin| {
                    let result = self.run_one(plugin);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(&plugin.slug, done, total);
                    }
                    result
                })
                .collect()
        });

        self.check_abort(results)
    }

    /// In abort mode the first failure propagates as an error.
    fn check_abort(
        &self,
        results: Vec<Result<crate::models::PluginRunResult, PluginFailure>>,
    ) -> Result<Vec<Result<crate::models::PluginRunResult, PluginFailure>>> {
        if self.failure_mode == FailureMode::Abort {
            if let Some(failure) = results.iter().filter_map(|r| r.as_ref().err()).next() {
                anyhow::bail!("plugin '{}' failed: {}", failure.plugin, failure.error);
            }
        }
        Ok(results)
    }

    fn run_one(
        &self,
        plugin: &crate::config::PluginDefinition,
    ) -> Result<crate::models::PluginRunResult, PluginFailure> {
        let slug = plugin.slug.clone();
        let observer = move |msg: &str| debug!("Plugin {}: {}", slug, msg);
        let ctx = RunnerContext::new(&self.directory).with_progress(&observer);

        runner::execute(plugin, &ctx).map_err(|e| PluginFailure {
            plugin: plugin.slug.clone(),
            error: e.to_string(),
        })
    }
}
