//! Report diff engine
//!
//! Compares two reports and classifies every audit, group, and category as
//! added, removed, changed, or unchanged. Items are paired by a stable key:
//! plugin slug for plugins' children (so audits and groups match on
//! `(plugin, slug)`), bare slug for categories.
//!
//! Classification is equality under caller-suppliable per-field predicates
//! ([`DiffOptions`]), so cosmetic display-value differences can be ignored.
//! Unchanged entries are reported by identity alone; changed entries carry
//! both snapshots plus a numeric score delta when both scores are defined.
//!
//! New audits or groups appearing only because a plugin was added or
//! upgraded are legitimately "added": that is a signal about the plugin
//! set, not a regression.
//!
//! The diff is derived, not canonical: computed on demand from two reports
//! and persisted separately by callers that want to keep it.

pub mod matching;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::models::Report;
use crate::scoring;
use matching::{classify_pairs, match_by_key};

/// Identity of one audit within a diff: enough to point at it, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditIdentity {
    pub plugin: String,
    pub slug: String,
    pub title: String,
    /// Package scope, stamped at merge time for monorepo artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// The compared fields of one audit at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSnapshot {
    pub score: f64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

/// An audit present on only one side of the diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDiffEntry {
    #[serde(flatten)]
    pub identity: AuditIdentity,
    #[serde(flatten)]
    pub snapshot: AuditSnapshot,
}

/// An audit present on both sides with a meaningful difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChange {
    #[serde(flatten)]
    pub identity: AuditIdentity,
    pub before: AuditSnapshot,
    pub after: AuditSnapshot,
    pub score_delta: f64,
}

/// Identity of one group within a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdentity {
    pub plugin: String,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// A group present on only one side; `score` is `None` when not applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDiffEntry {
    #[serde(flatten)]
    pub identity: GroupIdentity,
    pub score: Option<f64>,
}

/// A group whose score changed between the two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChange {
    #[serde(flatten)]
    pub identity: GroupIdentity,
    pub before: Option<f64>,
    pub after: Option<f64>,
    /// Defined only when both sides have a defined score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f64>,
}

/// Identity of one category within a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIdentity {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// A category present on only one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDiffEntry {
    #[serde(flatten)]
    pub identity: CategoryIdentity,
    pub score: Option<f64>,
}

/// A category whose score changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChange {
    #[serde(flatten)]
    pub identity: CategoryIdentity,
    pub before: Option<f64>,
    pub after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f64>,
}

/// One classified bucket of the diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffSection<Entry, Change, Identity> {
    pub added: Vec<Entry>,
    pub removed: Vec<Entry>,
    pub changed: Vec<Change>,
    pub unchanged: Vec<Identity>,
}

impl<E, C, I> Default for DiffSection<E, C, I> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

impl<E, C, I> DiffSection<E, C, I> {
    /// Whether this section records any difference at all.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty())
    }
}

/// The commits the two compared reports were collected against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsPair {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// A derived, classified comparison between two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsDiff {
    /// Caller-supplied label, typically the package name in monorepo runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub commits: CommitsPair,
    pub categories: DiffSection<CategoryDiffEntry, CategoryChange, CategoryIdentity>,
    pub groups: DiffSection<GroupDiffEntry, GroupChange, GroupIdentity>,
    pub audits: DiffSection<AuditDiffEntry, AuditChange, AuditIdentity>,
}

impl ReportsDiff {
    /// Whether anything was added, removed, or changed in any section.
    pub fn has_changes(&self) -> bool {
        self.categories.has_changes() || self.groups.has_changes() || self.audits.has_changes()
    }
}

/// Per-field equality predicates used to classify pairs as changed.
///
/// Defaults are exact equality; callers can relax individual fields, e.g.
/// to ignore cosmetic display-value differences.
pub struct DiffOptions {
    pub score_eq: Box<dyn Fn(f64, f64) -> bool>,
    pub value_eq: Box<dyn Fn(f64, f64) -> bool>,
    pub display_value_eq: Box<dyn Fn(Option<&str>, Option<&str>) -> bool>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            score_eq: Box::new(|a, b| a == b),
            value_eq: Box::new(|a, b| a == b),
            display_value_eq: Box::new(|a, b| a == b),
        }
    }
}

impl DiffOptions {
    /// Ignore display-value differences entirely.
    pub fn ignore_display_value(mut self) -> Self {
        self.display_value_eq = Box::new(|_, _| true);
        self
    }

    fn scores_eq(&self, a: Option<f64>, b: Option<f64>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => (self.score_eq)(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// An audit flattened out of its plugin, carrying its parent scope.
#[derive(Debug, Clone)]
struct FlatAudit {
    plugin: String,
    result: crate::models::AuditResult,
}

/// A group flattened out of its plugin with its computed score.
#[derive(Debug, Clone)]
struct FlatGroup {
    plugin: String,
    slug: String,
    title: String,
    score: Option<f64>,
}

/// A category with its computed score.
#[derive(Debug, Clone)]
struct FlatCategory {
    slug: String,
    title: String,
    score: Option<f64>,
}

/// Compare two reports and classify every difference.
///
/// `diff(r, r)` yields empty added/removed/changed buckets in every section.
pub fn diff(before: &Report, after: &Report, opts: &DiffOptions) -> Result<ReportsDiff, MergeError> {
    if before.package_name != after.package_name {
        return Err(MergeError::PackageMismatch {
            before: before.package_name.clone(),
            after: after.package_name.clone(),
        });
    }

    Ok(ReportsDiff {
        label: None,
        commits: CommitsPair {
            before: before.commit.clone(),
            after: after.commit.clone(),
        },
        categories: diff_categories(before, after, opts),
        groups: diff_groups(before, after, opts),
        audits: diff_audits(before, after, opts),
    })
}

fn flatten_audits(report: &Report) -> Vec<FlatAudit> {
    report
        .plugins
        .iter()
        .flat_map(|plugin| {
            plugin.audits.iter().map(|result| FlatAudit {
                plugin: plugin.slug.clone(),
                result: result.clone(),
            })
        })
        .collect()
}

fn flatten_groups(report: &Report) -> Vec<FlatGroup> {
    report
        .plugins
        .iter()
        .flat_map(|plugin| {
            plugin.groups.iter().map(|group| FlatGroup {
                plugin: plugin.slug.clone(),
                slug: group.slug.clone(),
                title: group.title.clone(),
                score: scoring::score_group(group, &plugin.audits),
            })
        })
        .collect()
}

fn flatten_categories(report: &Report) -> Vec<FlatCategory> {
    report
        .categories
        .iter()
        .map(|category| FlatCategory {
            slug: category.slug.clone(),
            title: category.title.clone(),
            score: scoring::score_category(category, &report.plugins),
        })
        .collect()
}

fn audit_identity(flat: &FlatAudit) -> AuditIdentity {
    AuditIdentity {
        plugin: flat.plugin.clone(),
        slug: flat.result.slug.clone(),
        title: flat.result.title.clone(),
        package: None,
    }
}

fn audit_snapshot(flat: &FlatAudit) -> AuditSnapshot {
    AuditSnapshot {
        score: flat.result.score,
        value: flat.result.value,
        display_value: flat.result.display_value.clone(),
    }
}

fn audit_entry(flat: &FlatAudit) -> AuditDiffEntry {
    AuditDiffEntry {
        identity: audit_identity(flat),
        snapshot: audit_snapshot(flat),
    }
}

fn diff_audits(
    before: &Report,
    after: &Report,
    opts: &DiffOptions,
) -> DiffSection<AuditDiffEntry, AuditChange, AuditIdentity> {
    let matched = match_by_key(
        &flatten_audits(before),
        &flatten_audits(after),
        |a: &FlatAudit| (a.plugin.clone(), a.result.slug.clone()),
    );

    let classified = classify_pairs(matched.pairs, |b, a| {
        !(opts.score_eq)(b.result.score, a.result.score)
            || !(opts.value_eq)(b.result.value, a.result.value)
            || !(opts.display_value_eq)(
                b.result.display_value.as_deref(),
                a.result.display_value.as_deref(),
            )
    });

    DiffSection {
        added: matched.added.iter().map(audit_entry).collect(),
        removed: matched.removed.iter().map(audit_entry).collect(),
        changed: classified
            .changed
            .into_iter()
            .map(|(b, a)| AuditChange {
                identity: audit_identity(&a),
                score_delta: a.result.score - b.result.score,
                before: audit_snapshot(&b),
                after: audit_snapshot(&a),
            })
            .collect(),
        unchanged: classified
            .unchanged
            .iter()
            .map(|(_, a)| audit_identity(a))
            .collect(),
    }
}

fn group_identity(flat: &FlatGroup) -> GroupIdentity {
    GroupIdentity {
        plugin: flat.plugin.clone(),
        slug: flat.slug.clone(),
        title: flat.title.clone(),
        package: None,
    }
}

fn diff_groups(
    before: &Report,
    after: &Report,
    opts: &DiffOptions,
) -> DiffSection<GroupDiffEntry, GroupChange, GroupIdentity> {
    let matched = match_by_key(
        &flatten_groups(before),
        &flatten_groups(after),
        |g: &FlatGroup| (g.plugin.clone(), g.slug.clone()),
    );

    let classified = classify_pairs(matched.pairs, |b, a| !opts.scores_eq(b.score, a.score));

    let entry = |g: &FlatGroup| GroupDiffEntry {
        identity: group_identity(g),
        score: g.score,
    };

    DiffSection {
        added: matched.added.iter().map(entry).collect(),
        removed: matched.removed.iter().map(entry).collect(),
        changed: classified
            .changed
            .into_iter()
            .map(|(b, a)| GroupChange {
                identity: group_identity(&a),
                score_delta: match (b.score, a.score) {
                    (Some(before), Some(after)) => Some(after - before),
                    _ => None,
                },
                before: b.score,
                after: a.score,
            })
            .collect(),
        unchanged: classified
            .unchanged
            .iter()
            .map(|(_, a)| group_identity(a))
            .collect(),
    }
}

fn diff_categories(
    before: &Report,
    after: &Report,
    opts: &DiffOptions,
) -> DiffSection<CategoryDiffEntry, CategoryChange, CategoryIdentity> {
    let matched = match_by_key(
        &flatten_categories(before),
        &flatten_categories(after),
        |c: &FlatCategory| c.slug.clone(),
    );

    let classified = classify_pairs(matched.pairs, |b, a| !opts.scores_eq(b.score, a.score));

    let identity = |c: &FlatCategory| CategoryIdentity {
        slug: c.slug.clone(),
        title: c.title.clone(),
        package: None,
    };
    let entry = |c: &FlatCategory| CategoryDiffEntry {
        identity: identity(c),
        score: c.score,
    };

    DiffSection {
        added: matched.added.iter().map(entry).collect(),
        removed: matched.removed.iter().map(entry).collect(),
        changed: classified
            .changed
            .into_iter()
            .map(|(b, a)| CategoryChange {
                identity: identity(&a),
                score_delta: match (b.score, a.score) {
                    (Some(before), Some(after)) => Some(after - before),
                    _ => None,
                },
                before: b.score,
                after: a.score,
            })
            .collect(),
        unchanged: classified
            .unchanged
            .iter()
            .map(|(_, a)| identity(a))
            .collect(),
    }
}

/// Merge per-package diffs into one artifact by section concatenation.
///
/// Each entry is stamped with its package (the diff's label) so merged
/// sections stay unambiguous; scores are never re-aggregated. Commits are
/// kept only when every input agrees.
pub fn merge_diffs(diffs: Vec<ReportsDiff>) -> ReportsDiff {
    let commits = match diffs.first() {
        Some(first) if diffs.iter().all(|d| d.commits == first.commits) => first.commits.clone(),
        _ => CommitsPair::default(),
    };

    let mut merged = ReportsDiff {
        label: None,
        commits,
        categories: DiffSection::default(),
        groups: DiffSection::default(),
        audits: DiffSection::default(),
    };

    for mut diff in diffs {
        let package = diff.label.take();
        stamp_and_extend(&mut merged, diff, package.as_deref());
    }

    merged
}

fn stamp_and_extend(merged: &mut ReportsDiff, mut diff: ReportsDiff, package: Option<&str>) {
    let stamp = |slot: &mut Option<String>| {
        if slot.is_none() {
            *slot = package.map(str::to_string);
        }
    };

    for e in &mut diff.audits.added {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.audits.removed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.audits.changed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.audits.unchanged {
        stamp(&mut e.package);
    }
    for e in &mut diff.groups.added {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.groups.removed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.groups.changed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.groups.unchanged {
        stamp(&mut e.package);
    }
    for e in &mut diff.categories.added {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.categories.removed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.categories.changed {
        stamp(&mut e.identity.package);
    }
    for e in &mut diff.categories.unchanged {
        stamp(&mut e.package);
    }

    merged.audits.added.extend(diff.audits.added);
    merged.audits.removed.extend(diff.audits.removed);
    merged.audits.changed.extend(diff.audits.changed);
    merged.audits.unchanged.extend(diff.audits.unchanged);
    merged.groups.added.extend(diff.groups.added);
    merged.groups.removed.extend(diff.groups.removed);
    merged.groups.changed.extend(diff.groups.changed);
    merged.groups.unchanged.extend(diff.groups.unchanged);
    merged.categories.added.extend(diff.categories.added);
    merged.categories.removed.extend(diff.categories.removed);
    merged.categories.changed.extend(diff.categories.changed);
    merged.categories.unchanged.extend(diff.categories.unchanged);
}
