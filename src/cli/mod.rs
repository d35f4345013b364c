//! CLI command definitions and handlers

mod collect;
mod compare;
pub mod config_file;
mod merge;
mod monorepo;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Scorecard - plugin-based code quality collection and diffing
#[derive(Parser, Debug)]
#[command(name = "scorecard")]
#[command(
    version,
    about = "Collect code quality audits from configured plugins, score them, and diff runs",
    after_help = "\
Examples:
  scorecard collect                       Run plugins from ./scorecard.toml
  scorecard collect --workers 4           Run independent plugins in parallel
  scorecard compare before.json after.json   Classify every change between two reports
  scorecard monorepo --parallel           Collect every workspace package at once"
)]
pub struct Cli {
    /// Package or workspace root to operate in (default: current directory)
    #[arg(long = "dir", short = 'C', global = true, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every configured plugin and write the report
    Collect {
        /// Config file path (default: scorecard.toml in the package directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report output path (default: .scorecard/report.json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run independent plugins on a worker pool (1-64)
        #[arg(long, value_parser = parse_workers)]
        workers: Option<usize>,

        /// Record failed plugins and keep collecting instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Suppress progress and summary output
        #[arg(long)]
        silent: bool,
    },

    /// Compare two reports and write the classified diff
    Compare {
        /// Report collected before the change
        before: PathBuf,

        /// Report collected after the change
        after: PathBuf,

        /// Diff output path (default: .scorecard/diff.json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Label stamped into the diff, typically the package name
        #[arg(long)]
        label: Option<String>,

        /// Ignore cosmetic display-value differences
        #[arg(long)]
        ignore_display_value: bool,

        /// Accepted for workspace-invocation symmetry; compare reads no config
        #[arg(long, hide = true)]
        config: Option<PathBuf>,

        /// Suppress summary output
        #[arg(long)]
        silent: bool,
    },

    /// Merge per-package diff artifacts into one
    MergeDiffs {
        /// Diff artifacts to merge, in package order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Merged output path (default: .scorecard/merged-diff.json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Suppress summary output
        #[arg(long)]
        silent: bool,
    },

    /// Run collect or compare across every workspace package
    Monorepo {
        /// Task to fan out
        #[arg(long, default_value = "collect", value_parser = ["collect", "compare"])]
        task: String,

        /// Run packages concurrently, one worker per package
        #[arg(long)]
        parallel: bool,

        /// Bounded worker pool size (1-64); overrides --parallel
        #[arg(long, value_parser = parse_workers)]
        workers: Option<usize>,

        /// Merged output path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Config path forwarded to every package invocation
        #[arg(long)]
        config: Option<PathBuf>,

        /// Suppress per-package output
        #[arg(long)]
        silent: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Collect {
            config,
            output,
            workers,
            keep_going,
            silent,
        } => collect::run(
            &cli.path,
            config.as_deref(),
            output.as_deref(),
            workers,
            keep_going,
            silent,
        ),

        Commands::Compare {
            before,
            after,
            output,
            label,
            ignore_display_value,
            config: _,
            silent,
        } => compare::run(
            &cli.path,
            &before,
            &after,
            output.as_deref(),
            label,
            ignore_display_value,
            silent,
        ),

        Commands::MergeDiffs {
            inputs,
            output,
            silent,
        } => merge::run(&cli.path, &inputs, output.as_deref(), silent),

        Commands::Monorepo {
            task,
            parallel,
            workers,
            output,
            config,
            silent,
        } => monorepo::run(
            &cli.path,
            &task,
            parallel,
            workers,
            output.as_deref(),
            config.as_deref(),
            silent,
        ),
    }
}
