//! Weighted score aggregation
//!
//! Rolls audit-level scores up into group and category scores.
//!
//! # Scoring Formula
//!
//! ```text
//! Group score    = Σ(weightᵢ × scoreᵢ) / Σ(weightᵢ)   over resolved refs
//! Category score = same formula, where an audit ref resolves directly and
//!                  a group ref resolves via the group score (one level of
//!                  indirection only, groups never nest)
//! ```
//!
//! A total weight of zero yields `None` ("not applicable"), never a
//! division-by-zero value. `None` is distinct from a score of 0: the former
//! means nothing was scorable, the latter means everything scorable failed.
//!
//! Refs whose score cannot be resolved (missing result, or a group whose own
//! score is `None`) are skipped as if absent. All arithmetic stays
//! full-precision f64; rounding is a display concern handled elsewhere.

use crate::models::{Category, CategoryRefKind, Group, PluginRunResult};

/// Weighted average of a group's audit scores, `None` if the total resolved
/// weight is zero.
pub fn score_group(group: &Group, audits: &[crate::models::AuditResult]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for gref in &group.refs {
        if gref.weight == 0.0 {
            continue;
        }
        if let Some(result) = audits.iter().find(|a| a.slug == gref.slug) {
            weighted_sum += gref.weight * result.score;
            total_weight += gref.weight;
        }
    }

    if total_weight == 0.0 {
        None
    } else {
        Some(weighted_sum / total_weight)
    }
}

/// Weighted average over a category's resolved refs, `None` if nothing
/// resolves to a defined score.
pub fn score_category(category: &Category, plugins: &[PluginRunResult]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for cref in &category.refs {
        if cref.weight == 0.0 {
            continue;
        }
        let Some(score) = resolve_ref_score(cref, plugins) else {
            continue;
        };
        weighted_sum += cref.weight * score;
        total_weight += cref.weight;
    }

    if total_weight == 0.0 {
        None
    } else {
        Some(weighted_sum / total_weight)
    }
}

/// Resolve one category ref to a score, if it has one.
fn resolve_ref_score(
    cref: &crate::models::CategoryRef,
    plugins: &[PluginRunResult],
) -> Option<f64> {
    let plugin = plugins.iter().find(|p| p.slug == cref.plugin)?;
    match cref.kind {
        CategoryRefKind::Audit => plugin.audit(&cref.slug).map(|a| a.score),
        CategoryRefKind::Group => plugin
            .group(&cref.slug)
            .and_then(|g| score_group(g, &plugin.audits)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditResult, CategoryRef, GroupRef};
    use chrono::Utc;

    fn group(refs: &[(&str, f64)]) -> Group {
        Group {
            slug: "g".to_string(),
            title: "G".to_string(),
            refs: refs
                .iter()
                .map(|(slug, weight)| GroupRef {
                    slug: slug.to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    fn plugin_run(slug: &str, audits: Vec<AuditResult>, groups: Vec<Group>) -> PluginRunResult {
        PluginRunResult {
            slug: slug.to_string(),
            title: slug.to_string(),
            groups,
            audits,
            date: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_group_weighted_average() {
        let audits = vec![
            AuditResult::new("a", 0.0, 1.0),
            AuditResult::new("b", 0.0, 0.0),
        ];
        // 3·1.0 + 1·0.0 over weight 4 = 0.75
        let score = score_group(&group(&[("a", 3.0), ("b", 1.0)]), &audits).unwrap();
        assert!((score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_group_zero_total_weight_is_not_applicable() {
        let audits = vec![AuditResult::new("a", 0.0, 1.0)];
        assert_eq!(score_group(&group(&[("a", 0.0)]), &audits), None);
    }

    #[test]
    fn test_group_skips_missing_results() {
        let audits = vec![AuditResult::new("a", 0.0, 0.5)];
        let score = score_group(&group(&[("a", 1.0), ("missing", 9.0)]), &audits).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_category_mixes_audit_and_group_refs() {
        let plugin = plugin_run(
            "p",
            vec![
                AuditResult::new("a", 0.0, 1.0),
                AuditResult::new("b", 0.0, 0.5),
            ],
            vec![group(&[("b", 1.0)])],
        );
        let category = Category {
            slug: "c".to_string(),
            title: "C".to_string(),
            refs: vec![
                CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "p".to_string(),
                    slug: "a".to_string(),
                    weight: 1.0,
                },
                CategoryRef {
                    kind: CategoryRefKind::Group,
                    plugin: "p".to_string(),
                    slug: "g".to_string(),
                    weight: 1.0,
                },
            ],
        };

        let score = score_category(&category, &[plugin]).unwrap();
        assert!((score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_category_undefined_iff_no_resolvable_weight() {
        // A category whose only refs are zero-weight or unresolvable yields
        // None, which must stay distinct from a score of 0.
        let plugin = plugin_run(
            "p",
            vec![AuditResult::new("a", 0.0, 0.0)],
            vec![group(&[("a", 0.0)])],
        );
        let category = Category {
            slug: "c".to_string(),
            title: "C".to_string(),
            refs: vec![
                CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "p".to_string(),
                    slug: "a".to_string(),
                    weight: 0.0,
                },
                // Group ref with weight, but the group itself has zero
                // total weight, so it resolves to None and is skipped.
                CategoryRef {
                    kind: CategoryRefKind::Group,
                    plugin: "p".to_string(),
                    slug: "g".to_string(),
                    weight: 5.0,
                },
            ],
        };

        assert_eq!(score_category(&category, &[plugin.clone()]), None);

        // Same category with a real scorable ref is defined and in [0, 1].
        let scored = Category {
            refs: vec![CategoryRef {
                kind: CategoryRefKind::Audit,
                plugin: "p".to_string(),
                slug: "a".to_string(),
                weight: 1.0,
            }],
            ..scored_base()
        };
        let score = score_category(&scored, &[plugin]).unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(score, 0.0);
    }

    fn scored_base() -> Category {
        Category {
            slug: "c".to_string(),
            title: "C".to_string(),
            refs: vec![],
        }
    }

    #[test]
    fn test_category_ref_to_unknown_plugin_is_skipped() {
        let plugin = plugin_run("p", vec![AuditResult::new("a", 0.0, 1.0)], vec![]);
        let category = Category {
            refs: vec![
                CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "ghost".to_string(),
                    slug: "a".to_string(),
                    weight: 10.0,
                },
                CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "p".to_string(),
                    slug: "a".to_string(),
                    weight: 1.0,
                },
            ],
            ..scored_base()
        };
        let score = score_category(&category, &[plugin]).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }
}
