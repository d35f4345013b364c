//! End-to-end pipeline tests: config → collect → score → persist → diff

#![cfg(unix)]

use std::path::Path;

use scorecard::config::{CoreConfig, PluginDefinition};
use scorecard::diff::{diff, DiffOptions};
use scorecard::models::{Audit, Category, CategoryRef, CategoryRefKind, Group, GroupRef, Report};
use scorecard::report::{json, FailureMode, ReportAssembler};
use scorecard::runner::RunnerSpec;
use scorecard::scoring;

/// A command plugin backed by a sh script that writes its audit results.
fn sh_plugin(dir: &Path, slug: &str, score: f64) -> PluginDefinition {
    let out = format!("{slug}-out.json");
    let script = format!(
        r#"echo '[{{"slug": "{slug}-check", "value": 1.0, "score": {score}}}]' > {out}"#
    );
    PluginDefinition::new(
        slug,
        slug.to_uppercase(),
        RunnerSpec::Command {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script],
            output_file: dir.join(out),
        },
    )
    .with_audit(Audit::new(format!("{slug}-check"), "Check"))
    .with_group(Group {
        slug: "main".to_string(),
        title: "Main".to_string(),
        refs: vec![GroupRef {
            slug: format!("{slug}-check"),
            weight: 1.0,
        }],
    })
}

fn quality_category(plugins: &[&str]) -> Category {
    Category {
        slug: "quality".to_string(),
        title: "Quality".to_string(),
        refs: plugins
            .iter()
            .map(|p| CategoryRef {
                kind: CategoryRefKind::Group,
                plugin: p.to_string(),
                slug: "main".to_string(),
                weight: 1.0,
            })
            .collect(),
    }
}

#[test]
fn test_collect_score_persist_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::new(
        vec![
            sh_plugin(dir.path(), "coverage", 0.8),
            sh_plugin(dir.path(), "lint", 0.6),
        ],
        vec![quality_category(&["coverage", "lint"])],
    );

    let outcome = ReportAssembler::new(config, "api", "1.0.0")
        .with_directory(dir.path())
        .with_commit("abc123")
        .run()
        .unwrap();
    assert!(outcome.all_succeeded());

    // Category score is the weighted mean of both group scores
    let score = scoring::score_category(&outcome.report.categories[0], &outcome.report.plugins);
    assert!((score.unwrap() - 0.7).abs() < 1e-12);

    // Persist and reload: same audits come back by slug
    let path = dir.path().join(".scorecard/report.json");
    json::save(&outcome.report, &path).unwrap();
    let loaded: Report = json::load(&path).unwrap();
    assert_eq!(loaded.commit.as_deref(), Some("abc123"));
    let audit = loaded.audit("coverage", "coverage-check").unwrap();
    assert!((audit.score - 0.8).abs() < f64::EPSILON);
}

#[test]
fn test_two_collections_diff_shows_movement() {
    let dir = tempfile::tempdir().unwrap();

    let collect = |score: f64| {
        let config = CoreConfig::new(
            vec![sh_plugin(dir.path(), "coverage", score)],
            vec![quality_category(&["coverage"])],
        );
        ReportAssembler::new(config, "api", "1.0.0")
            .with_directory(dir.path())
            .run()
            .unwrap()
            .report
    };

    let before = collect(0.5);
    let after = collect(0.9);

    let d = diff(&before, &after, &DiffOptions::default()).unwrap();
    assert_eq!(d.audits.changed.len(), 1);
    assert!((d.audits.changed[0].score_delta - 0.4).abs() < 1e-12);
    assert_eq!(d.groups.changed.len(), 1);
    assert_eq!(d.categories.changed.len(), 1);

    // Identical snapshots diff clean
    let clean = diff(&after, &after, &DiffOptions::default()).unwrap();
    assert!(!clean.has_changes());
}

#[test]
fn test_failing_command_plugin_tolerated_in_continue_mode() {
    let dir = tempfile::tempdir().unwrap();
    let broken = PluginDefinition::new(
        "broken",
        "Broken",
        RunnerSpec::Command {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 9".to_string()],
            output_file: dir.path().join("never.json"),
        },
    );
    let config = CoreConfig::new(vec![sh_plugin(dir.path(), "coverage", 0.8), broken], vec![]);

    let outcome = ReportAssembler::new(config, "api", "1.0.0")
        .with_directory(dir.path())
        .with_failure_mode(FailureMode::Continue)
        .run()
        .unwrap();

    assert!(!outcome.all_succeeded());
    assert_eq!(outcome.failures[0].plugin, "broken");
    assert!(outcome.report.plugin("coverage").is_some());
}
