//! Scorecard - plugin-based code quality aggregation
//!
//! Collects audit results from configured plugins, rolls them up into
//! weighted group and category scores, diffs collected reports, and fans
//! collection out across multi-package workspaces.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod monorepo;
pub mod report;
pub mod runner;
pub mod scoring;
