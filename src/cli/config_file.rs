//! scorecard.toml loading
//!
//! A thin file shim over [`CoreConfig`]: the TOML file declares plugins with
//! command runners plus the cross-plugin categories, and converts 1:1 into
//! the programmatic config. Only an explicit path (or `scorecard.toml` in
//! the working directory) is honored; there is no upward discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::{CoreConfig, PluginDefinition};
use crate::models::{Audit, Category, Group};
use crate::runner::RunnerSpec;

/// Default config file name looked up in the package directory.
pub const DEFAULT_CONFIG_FILE: &str = "scorecard.toml";

/// Top-level scorecard.toml shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Package name; defaults to the directory name when omitted
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "plugin")]
    pub plugins: Vec<FilePlugin>,
    #[serde(default, rename = "category")]
    pub categories: Vec<Category>,
}

/// One `[[plugin]]` table: a command runner plus its declarations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePlugin {
    pub slug: String,
    pub title: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Path the tool writes its results to, relative to the package directory
    pub output_file: PathBuf,
    #[serde(default, rename = "audit")]
    pub audits: Vec<Audit>,
    #[serde(default, rename = "group")]
    pub groups: Vec<Group>,
}

impl FileConfig {
    /// Convert into the programmatic config. Validation happens later, at
    /// the start of the collection run.
    pub fn into_core_config(self) -> CoreConfig {
        let plugins = self
            .plugins
            .into_iter()
            .map(|p| {
                let mut def = PluginDefinition::new(
                    p.slug,
                    p.title,
                    RunnerSpec::Command {
                        command: p.command,
                        args: p.args,
                        output_file: p.output_file,
                    },
                );
                def.audits = p.audits;
                def.groups = p.groups;
                def
            })
            .collect();
        CoreConfig::new(plugins, self.categories)
    }
}

/// Load and parse a scorecard.toml file.
pub fn load(path: &Path) -> Result<FileConfig> {
    debug!("Loading config from {:?}", path);
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading config {path:?}"))?;
    toml::from_str(&content).with_context(|| format!("parsing config {path:?}"))
}
