//! Plugin runner
//!
//! Executes one plugin's declared work and normalizes its result. Runners
//! come in two variants, modeled as a tagged union dispatched through one
//! [`execute`] contract:
//!
//! 1. **Command**: run an external tool as a subprocess with
//!    `std::process::Command`, capture stdout/stderr for diagnostics, then
//!    read and parse the output file the tool wrote.
//! 2. **Callable**: invoke an in-process closure directly, forwarding an
//!    optional progress observer.
//!
//! Either way the raw results are validated against the audit result
//! contract and cross-checked against the plugin's declared audits before
//! they enter a report. Retry/continue policy is the caller's concern; the
//! runner itself never retries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::PluginDefinition;
use crate::error::RunnerError;
use crate::models::{AuditResult, PluginRunResult};

/// Progress observer forwarded to callable runners.
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// In-process runner: a closure producing raw audit results.
#[derive(Clone)]
pub struct CallableRunner(
    Arc<dyn Fn(Option<&ProgressFn>) -> anyhow::Result<Vec<AuditResult>> + Send + Sync>,
);

impl CallableRunner {
    pub fn new(
        invoke: impl Fn(Option<&ProgressFn>) -> anyhow::Result<Vec<AuditResult>> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(invoke))
    }

    /// Invoke the closure, forwarding the progress observer.
    pub fn invoke(&self, progress: Option<&ProgressFn>) -> anyhow::Result<Vec<AuditResult>> {
        (self.0)(progress)
    }
}

impl fmt::Debug for CallableRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallableRunner(..)")
    }
}

/// Declared work for one plugin: external command or in-process callable.
#[derive(Debug, Clone)]
pub enum RunnerSpec {
    /// Spawn `command args..` and read audit results from `output_file`.
    Command {
        command: String,
        args: Vec<String>,
        /// Path the external tool writes its results to, resolved relative
        /// to the plugin's working directory.
        output_file: PathBuf,
    },
    Callable(CallableRunner),
}

impl RunnerSpec {
    /// Shorthand for a callable runner.
    pub fn callable(
        invoke: impl Fn(Option<&ProgressFn>) -> anyhow::Result<Vec<AuditResult>> + Send + Sync + 'static,
    ) -> Self {
        RunnerSpec::Callable(CallableRunner::new(invoke))
    }
}

/// Per-invocation context for a runner.
pub struct RunnerContext<'a> {
    /// Working directory for command runners
    pub directory: &'a Path,
    /// Optional progress observer forwarded to callable runners
    pub progress: Option<&'a ProgressFn>,
}

impl<'a> RunnerContext<'a> {
    pub fn new(directory: &'a Path) -> Self {
        Self {
            directory,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Monotonic suffix so concurrent runners in one process never collide.
static OUTPUT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Derive a unique output path for one runner invocation.
///
/// Concurrent plugins or concurrent packages must never race on the same
/// file, so the name mixes a timestamp, the process id, and a per-process
/// counter.
pub fn unique_output_path(dir: &Path, plugin_slug: &str) -> PathBuf {
    let n = OUTPUT_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        "{}-{}-{}-{}.json",
        plugin_slug,
        Utc::now().timestamp_micros(),
        std::process::id(),
        n
    ))
}

/// Execute one plugin's runner and normalize the result.
///
/// Wall-clock `duration_ms` and `date` are measured around the execution
/// step only, not around config loading or validation.
pub fn execute(
    plugin: &PluginDefinition,
    ctx: &RunnerContext<'_>,
) -> Result<PluginRunResult, RunnerError> {
    let date = Utc::now();
    let start = Instant::now();

    let raw = match &plugin.runner {
        RunnerSpec::Command {
            command,
            args,
            output_file,
        } => run_command_variant(&plugin.slug, command, args, output_file, ctx.directory)?,
        RunnerSpec::Callable(callable) => {
            callable
                .invoke(ctx.progress)
                .map_err(|e| RunnerError::Execution {
                    plugin: plugin.slug.clone(),
                    reason: e.to_string(),
                })?
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let audits = normalize_results(plugin, raw)?;

    debug!(
        "Plugin {} produced {} audit results in {}ms",
        plugin.slug,
        audits.len(),
        duration_ms
    );

    Ok(PluginRunResult {
        slug: plugin.slug.clone(),
        title: plugin.title.clone(),
        groups: plugin.groups.clone(),
        audits,
        date,
        duration_ms,
    })
}

/// Spawn the external command, wait for it, then read its output file.
fn run_command_variant(
    plugin: &str,
    command: &str,
    args: &[String],
    output_file: &Path,
    directory: &Path,
) -> Result<Vec<AuditResult>, RunnerError> {
    debug!("Running plugin {}: {} {:?}", plugin, command, args);

    let output = Command::new(command)
        .args(args)
        .current_dir(directory)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                format!("command '{}' not found", command)
            } else {
                format!("failed to spawn '{}': {}", command, e)
            };
            RunnerError::Execution {
                plugin: plugin.to_string(),
                reason,
            }
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        warn!("Plugin {} exited with {}", plugin, output.status);
        return Err(RunnerError::Execution {
            plugin: plugin.to_string(),
            reason: format!(
                "'{}' exited with {}; stderr: {}",
                command,
                output.status,
                stderr.trim()
            ),
        });
    }

    if !stderr.is_empty() {
        debug!("Plugin {} stderr: {}", plugin, stderr.trim());
    }
    if !stdout.is_empty() {
        debug!("Plugin {} stdout: {}", plugin, stdout.trim());
    }

    let path = if output_file.is_absolute() {
        output_file.to_path_buf()
    } else {
        directory.join(output_file)
    };

    let content = std::fs::read_to_string(&path).map_err(|e| RunnerError::Execution {
        plugin: plugin.to_string(),
        reason: format!("missing or unreadable output file {:?}: {}", path, e),
    })?;

    serde_json::from_str(&content).map_err(|e| RunnerError::Execution {
        plugin: plugin.to_string(),
        reason: format!("malformed output file {:?}: {}", path, e),
    })
}

/// Validate raw results against the contract and the plugin's declared
/// audits, and fill in declared titles.
fn normalize_results(
    plugin: &PluginDefinition,
    raw: Vec<AuditResult>,
) -> Result<Vec<AuditResult>, RunnerError> {
    raw.into_iter()
        .map(|mut result| {
            if !(result.score.is_finite() && (0.0..=1.0).contains(&result.score)) {
                return Err(RunnerError::Validation {
                    plugin: plugin.slug.clone(),
                    reason: format!(
                        "audit '{}' has score {} outside [0, 1]",
                        result.slug, result.score
                    ),
                });
            }
            if !result.value.is_finite() {
                return Err(RunnerError::Validation {
                    plugin: plugin.slug.clone(),
                    reason: format!("audit '{}' has non-finite value", result.slug),
                });
            }

            let declared = plugin
                .audits
                .iter()
                .find(|a| a.slug == result.slug)
                .ok_or_else(|| RunnerError::Validation {
                    plugin: plugin.slug.clone(),
                    reason: format!("audit slug '{}' is not declared by the plugin", result.slug),
                })?;

            if result.title.is_empty() {
                result.title = declared.title.clone();
            }
            Ok(result)
        })
        .collect()
}
