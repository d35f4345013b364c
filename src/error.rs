//! Error taxonomy
//!
//! Three classes of failure with different blast radii:
//! - [`ConfigError`]: always fatal, raised at validation time before any
//!   plugin or package executes.
//! - [`RunnerError`]: per-plugin, recoverable only when the caller opted
//!   into continue-on-failure.
//! - [`MergeError`]: raised when diff/merge inputs are structurally
//!   incompatible, without discarding already-computed partial results.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems detected before any execution begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate plugin slug '{slug}'")]
    DuplicatePluginSlug { slug: String },

    #[error("plugin '{plugin}' declares duplicate audit slug '{slug}'")]
    DuplicateAuditSlug { plugin: String, slug: String },

    #[error("plugin '{plugin}' declares duplicate group slug '{slug}'")]
    DuplicateGroupSlug { plugin: String, slug: String },

    #[error("group '{group}' in plugin '{plugin}' has duplicate ref '{slug}'")]
    DuplicateGroupRef {
        plugin: String,
        group: String,
        slug: String,
    },

    #[error("group '{group}' in plugin '{plugin}' references undeclared audit '{slug}'")]
    DanglingGroupRef {
        plugin: String,
        group: String,
        slug: String,
    },

    #[error("category '{category}' has duplicate ref '{plugin}/{slug}'")]
    DuplicateCategoryRef {
        category: String,
        plugin: String,
        slug: String,
    },

    #[error("category '{category}' references unknown {kind} '{plugin}/{slug}'")]
    DanglingCategoryRef {
        category: String,
        kind: String,
        plugin: String,
        slug: String,
    },

    #[error("plugins '{first}' and '{second}' write to the same output file {path:?}")]
    DuplicateOutputFile {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("{entity} '{slug}' has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight {
        entity: String,
        slug: String,
        weight: f64,
    },

    #[error("no package manager handler matches workspace root {root:?}")]
    NoHandlerMatched { root: PathBuf },

    #[error("multiple package manager handlers match workspace root {root:?}: {matched:?}")]
    AmbiguousHandlers { root: PathBuf, matched: Vec<String> },
}

/// Per-plugin runner failures.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The runner itself failed: process could not be spawned, exited
    /// nonzero, or its declared output file is missing or unparseable.
    #[error("plugin '{plugin}' runner failed: {reason}")]
    Execution { plugin: String, reason: String },

    /// The runner completed but its output violates the audit result
    /// contract (undeclared slug, score out of range).
    #[error("plugin '{plugin}' produced an invalid audit result: {reason}")]
    Validation { plugin: String, reason: String },
}

impl RunnerError {
    /// Slug of the plugin the failure belongs to.
    pub fn plugin(&self) -> &str {
        match self {
            RunnerError::Execution { plugin, .. } => plugin,
            RunnerError::Validation { plugin, .. } => plugin,
        }
    }
}

/// Diff/merge inputs that cannot be combined.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("cannot diff reports for different packages: '{before}' vs '{after}'")]
    PackageMismatch { before: String, after: String },

    #[error("missing artifact for package '{package}' at {path:?}")]
    MissingArtifact { package: String, path: PathBuf },
}
