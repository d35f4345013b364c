//! Collection configuration and validation
//!
//! A [`CoreConfig`] is the in-memory declaration of what a collection run
//! executes: plugins (each with its audits, groups, and runner) plus the
//! cross-plugin categories. Config-file discovery and resolution live
//! outside the core; callers construct configs programmatically or through
//! the thin CLI shim.
//!
//! All structural invariants are enforced by [`CoreConfig::validate`]
//! before any plugin executes: slug uniqueness, ref resolution, weight
//! sanity. A config that passes validation cannot produce dangling lookups
//! later in the pipeline.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{Audit, Category, CategoryRefKind, Group};
use crate::runner::RunnerSpec;

/// A self-contained analysis unit: declared audits/groups and the runner
/// that produces results for them.
#[derive(Debug, Clone)]
pub struct PluginDefinition {
    pub slug: String,
    pub title: String,
    pub audits: Vec<Audit>,
    pub groups: Vec<Group>,
    pub runner: RunnerSpec,
}

impl PluginDefinition {
    pub fn new(slug: impl Into<String>, title: impl Into<String>, runner: RunnerSpec) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            audits: Vec::new(),
            groups: Vec::new(),
            runner,
        }
    }

    /// Add a declared audit.
    pub fn with_audit(mut self, audit: Audit) -> Self {
        self.audits.push(audit);
        self
    }

    /// Add a declared group.
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Whether the plugin declares an audit with this slug.
    pub fn declares_audit(&self, slug: &str) -> bool {
        self.audits.iter().any(|a| a.slug == slug)
    }

    /// Whether the plugin declares a group with this slug.
    pub fn declares_group(&self, slug: &str) -> bool {
        self.groups.iter().any(|g| g.slug == slug)
    }
}

/// Everything one collection run needs: plugins and categories.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub plugins: Vec<PluginDefinition>,
    pub categories: Vec<Category>,
}

impl CoreConfig {
    pub fn new(plugins: Vec<PluginDefinition>, categories: Vec<Category>) -> Self {
        Self {
            plugins,
            categories,
        }
    }

    /// Check every declaration-time invariant.
    ///
    /// Must be called before execution; the first violation found is
    /// returned and the whole run is aborted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut plugin_slugs = HashSet::new();
        let mut output_files: HashMap<&Path, &str> = HashMap::new();
        for plugin in &self.plugins {
            if !plugin_slugs.insert(plugin.slug.as_str()) {
                return Err(ConfigError::DuplicatePluginSlug {
                    slug: plugin.slug.clone(),
                });
            }
            // Two command runners sharing an output file would clobber
            // each other's results when run concurrently.
            if let RunnerSpec::Command { output_file, .. } = &plugin.runner {
                if let Some(first) = output_files.insert(output_file.as_path(), &plugin.slug) {
                    return Err(ConfigError::DuplicateOutputFile {
                        first: first.to_string(),
                        second: plugin.slug.clone(),
                        path: output_file.clone(),
                    });
                }
            }
            validate_plugin(plugin)?;
        }

        for category in &self.categories {
            self.validate_category(category)?;
        }

        Ok(())
    }

    fn validate_category(&self, category: &Category) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for cref in &category.refs {
            if !(cref.weight.is_finite() && cref.weight >= 0.0) {
                return Err(ConfigError::InvalidWeight {
                    entity: "category ref".to_string(),
                    slug: format!("{}/{}", cref.plugin, cref.slug),
                    weight: cref.weight,
                });
            }

            if !seen.insert((cref.kind, cref.plugin.as_str(), cref.slug.as_str())) {
                return Err(ConfigError::DuplicateCategoryRef {
                    category: category.slug.clone(),
                    plugin: cref.plugin.clone(),
                    slug: cref.slug.clone(),
                });
            }

            let resolved = self
                .plugins
                .iter()
                .find(|p| p.slug == cref.plugin)
                .is_some_and(|plugin| match cref.kind {
                    CategoryRefKind::Audit => plugin.declares_audit(&cref.slug),
                    CategoryRefKind::Group => plugin.declares_group(&cref.slug),
                });

            if !resolved {
                return Err(ConfigError::DanglingCategoryRef {
                    category: category.slug.clone(),
                    kind: cref.kind.to_string(),
                    plugin: cref.plugin.clone(),
                    slug: cref.slug.clone(),
                });
            }
        }
        Ok(())
    }
}

fn validate_plugin(plugin: &PluginDefinition) -> Result<(), ConfigError> {
    let mut audit_slugs = HashSet::new();
    for audit in &plugin.audits {
        if !audit_slugs.insert(audit.slug.as_str()) {
            return Err(ConfigError::DuplicateAuditSlug {
                plugin: plugin.slug.clone(),
                slug: audit.slug.clone(),
            });
        }
    }

    let mut group_slugs = HashSet::new();
    for group in &plugin.groups {
        if !group_slugs.insert(group.slug.as_str()) {
            return Err(ConfigError::DuplicateGroupSlug {
                plugin: plugin.slug.clone(),
                slug: group.slug.clone(),
            });
        }

        let mut ref_slugs = HashSet::new();
        for gref in &group.refs {
            if !(gref.weight.is_finite() && gref.weight >= 0.0) {
                return Err(ConfigError::InvalidWeight {
                    entity: "group ref".to_string(),
                    slug: format!("{}/{}", group.slug, gref.slug),
                    weight: gref.weight,
                });
            }
            if !ref_slugs.insert(gref.slug.as_str()) {
                return Err(ConfigError::DuplicateGroupRef {
                    plugin: plugin.slug.clone(),
                    group: group.slug.clone(),
                    slug: gref.slug.clone(),
                });
            }
            if !audit_slugs.contains(gref.slug.as_str()) {
                return Err(ConfigError::DanglingGroupRef {
                    plugin: plugin.slug.clone(),
                    group: group.slug.clone(),
                    slug: gref.slug.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryRef, GroupRef};

    fn noop_runner() -> RunnerSpec {
        RunnerSpec::callable(|_| Ok(vec![]))
    }

    fn coverage_plugin() -> PluginDefinition {
        PluginDefinition::new("coverage", "Coverage", noop_runner())
            .with_audit(Audit::new("line-coverage", "Line coverage"))
            .with_audit(Audit::new("branch-coverage", "Branch coverage"))
            .with_group(Group {
                slug: "all".to_string(),
                title: "All coverage".to_string(),
                refs: vec![
                    GroupRef {
                        slug: "line-coverage".to_string(),
                        weight: 1.0,
                    },
                    GroupRef {
                        slug: "branch-coverage".to_string(),
                        weight: 1.0,
                    },
                ],
            })
    }

    #[test]
    fn test_valid_config_passes() {
        let config = CoreConfig::new(
            vec![coverage_plugin()],
            vec![Category {
                slug: "tests".to_string(),
                title: "Tests".to_string(),
                refs: vec![CategoryRef {
                    kind: CategoryRefKind::Group,
                    plugin: "coverage".to_string(),
                    slug: "all".to_string(),
                    weight: 1.0,
                }],
            }],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_audit_slug_rejected() {
        let plugin = coverage_plugin().with_audit(Audit::new("line-coverage", "Again"));
        let config = CoreConfig::new(vec![plugin], vec![]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAuditSlug { .. })
        ));
    }

    #[test]
    fn test_duplicate_plugin_slug_rejected() {
        let config = CoreConfig::new(vec![coverage_plugin(), coverage_plugin()], vec![]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePluginSlug { .. })
        ));
    }

    #[test]
    fn test_shared_command_output_file_rejected() {
        let command_plugin = |slug: &str, out: &str| {
            PluginDefinition::new(
                slug,
                slug.to_uppercase(),
                RunnerSpec::Command {
                    command: "audit-tool".to_string(),
                    args: vec![],
                    output_file: std::path::PathBuf::from(out),
                },
            )
        };

        let config = CoreConfig::new(
            vec![
                command_plugin("lint", "out.json"),
                command_plugin("coverage", "out.json"),
            ],
            vec![],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateOutputFile { .. })
        ));

        let config = CoreConfig::new(
            vec![
                command_plugin("lint", "lint-out.json"),
                command_plugin("coverage", "coverage-out.json"),
            ],
            vec![],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dangling_group_ref_rejected() {
        let plugin = PluginDefinition::new("coverage", "Coverage", noop_runner())
            .with_audit(Audit::new("line-coverage", "Line coverage"))
            .with_group(Group {
                slug: "all".to_string(),
                title: "All".to_string(),
                refs: vec![GroupRef {
                    slug: "does-not-exist".to_string(),
                    weight: 1.0,
                }],
            });
        let config = CoreConfig::new(vec![plugin], vec![]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DanglingGroupRef { .. })
        ));
    }

    #[test]
    fn test_dangling_category_ref_rejected() {
        let config = CoreConfig::new(
            vec![coverage_plugin()],
            vec![Category {
                slug: "tests".to_string(),
                title: "Tests".to_string(),
                refs: vec![CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "coverage".to_string(),
                    slug: "mutation-score".to_string(),
                    weight: 1.0,
                }],
            }],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DanglingCategoryRef { .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let config = CoreConfig::new(
            vec![coverage_plugin()],
            vec![Category {
                slug: "tests".to_string(),
                title: "Tests".to_string(),
                refs: vec![CategoryRef {
                    kind: CategoryRefKind::Audit,
                    plugin: "coverage".to_string(),
                    slug: "line-coverage".to_string(),
                    weight: -1.0,
                }],
            }],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_duplicate_category_ref_rejected() {
        let make_ref = || CategoryRef {
            kind: CategoryRefKind::Audit,
            plugin: "coverage".to_string(),
            slug: "line-coverage".to_string(),
            weight: 1.0,
        };
        let config = CoreConfig::new(
            vec![coverage_plugin()],
            vec![Category {
                slug: "tests".to_string(),
                title: "Tests".to_string(),
                refs: vec![make_ref(), make_ref()],
            }],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCategoryRef { .. })
        ));
    }
}
