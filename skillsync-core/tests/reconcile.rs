use std::collections::BTreeSet;

use proptest::prelude::*;
use skillsync_core::catalog::{DetectionRegistry, SkillDetection};
use skillsync_core::config::{CategoryConfig, Config};
use skillsync_core::contract::TreeEntry;
use skillsync_core::reconcile::{list_skills, reconcile, DetectionStatus};

fn config(skills: Vec<(&str, CategoryConfig)>) -> Config {
    Config {
        registry: "https://github.com/acme/skills".to_string(),
        agents: None,
        skills: skills.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        custom_overrides: Vec::new(),
        feedback_url: None,
    }
}

fn deps(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn rules() -> DetectionRegistry {
    DetectionRegistry::new().with_rules(
        "flutter",
        vec![
            SkillDetection::new("bloc", &["flutter_bloc", "bloc"]),
            SkillDetection::new("riverpod", &["flutter_riverpod"]),
            SkillDetection::new("go-router", &["go_router"]),
        ],
    )
}

fn excluded(config: &Config, category: &str) -> Vec<String> {
    config.skills[category].exclude.clone().unwrap_or_default()
}

#[test]
fn unused_skills_are_excluded() {
    let mut cfg = config(vec![("flutter", CategoryConfig::pinned("flutter-v1.0.0"))]);
    let outcome = reconcile(&mut cfg, &deps(&["flutter_bloc"]), &rules());

    assert!(outcome.reenabled.is_empty());
    assert_eq!(
        outcome.disabled,
        vec![
            ("flutter".to_string(), "riverpod".to_string()),
            ("flutter".to_string(), "go-router".to_string()),
        ]
    );
    assert_eq!(excluded(&cfg, "flutter"), vec!["riverpod", "go-router"]);
}

#[test]
fn excluded_skill_is_reenabled_when_its_package_appears() {
    let mut cfg = config(vec![(
        "flutter",
        CategoryConfig {
            reference: None,
            include: None,
            exclude: Some(vec!["bloc".to_string(), "riverpod".to_string()]),
        },
    )]);
    let outcome = reconcile(&mut cfg, &deps(&["bloc", "go_router", "flutter_riverpod"]), &rules());

    assert_eq!(outcome.reenabled_in("flutter"), vec!["bloc", "riverpod"]);
    assert!(outcome.disabled.is_empty());
    assert_eq!(cfg.skills["flutter"].exclude, None);
}

#[test]
fn emptied_exclude_is_dropped_but_empty_include_is_kept() {
    let mut cfg = config(vec![(
        "flutter",
        CategoryConfig {
            reference: None,
            include: Some(Vec::new()),
            exclude: Some(vec!["bloc".to_string()]),
        },
    )]);
    reconcile(
        &mut cfg,
        &deps(&["flutter_bloc", "flutter_riverpod", "go_router"]),
        &rules(),
    );

    assert_eq!(cfg.skills["flutter"].exclude, None);
    assert_eq!(cfg.skills["flutter"].include, Some(Vec::new()));
}

#[test]
fn second_pass_changes_nothing() {
    let mut cfg = config(vec![(
        "flutter",
        CategoryConfig {
            reference: None,
            include: None,
            exclude: Some(vec!["bloc".to_string()]),
        },
    )]);
    let detected = deps(&["flutter_bloc"]);
    let first = reconcile(&mut cfg, &detected, &rules());
    assert!(first.changed());

    let snapshot = cfg.clone();
    let second = reconcile(&mut cfg, &detected, &rules());
    assert!(!second.changed());
    assert_eq!(cfg, snapshot);
}

#[test]
fn include_and_foreign_excludes_are_left_alone() {
    let mut cfg = config(vec![
        (
            "flutter",
            CategoryConfig {
                reference: None,
                include: Some(vec!["bloc".to_string(), "common/dart".to_string()]),
                exclude: Some(vec!["hand-picked".to_string()]),
            },
        ),
        ("golang", CategoryConfig::default()),
    ]);
    reconcile(&mut cfg, &deps(&["flutter_bloc", "go_router", "flutter_riverpod"]), &rules());

    assert_eq!(
        cfg.skills["flutter"].include,
        Some(vec!["bloc".to_string(), "common/dart".to_string()])
    );
    assert_eq!(excluded(&cfg, "flutter"), vec!["hand-picked"]);
    assert_eq!(cfg.skills["golang"], CategoryConfig::default());
    assert_eq!(cfg.skills.len(), 2);
}

#[test]
fn categories_without_rules_are_untouched() {
    let mut cfg = config(vec![("rails", CategoryConfig::default())]);
    let outcome = reconcile(&mut cfg, &BTreeSet::new(), &DetectionRegistry::builtin());
    assert!(!outcome.changed());
    assert_eq!(cfg.skills["rails"], CategoryConfig::default());
}

#[test]
fn builtin_flutter_rules_follow_pubspec_packages() {
    let mut cfg = config(vec![("flutter", CategoryConfig::default())]);
    reconcile(
        &mut cfg,
        &deps(&["flutter_bloc", "go_router"]),
        &DetectionRegistry::builtin(),
    );
    let exclude = excluded(&cfg, "flutter");
    assert!(exclude.contains(&"riverpod-state-management".to_string()));
    assert!(!exclude.contains(&"bloc-state-management".to_string()));
    assert!(!exclude.contains(&"go-router-navigation".to_string()));
}

#[test]
fn listing_reports_detection_status() {
    let entries = vec![
        TreeEntry::blob("skills/flutter/bloc/SKILL.md"),
        TreeEntry::blob("skills/flutter/riverpod/SKILL.md"),
        TreeEntry::blob("skills/flutter/widgets/SKILL.md"),
    ];
    let listed = list_skills("flutter", &entries, &deps(&["bloc"]), &rules());
    assert_eq!(
        listed,
        vec![
            ("bloc".to_string(), DetectionStatus::Detected),
            ("riverpod".to_string(), DetectionStatus::NotDetected),
            ("widgets".to_string(), DetectionStatus::NoRule),
        ]
    );
}

#[test]
fn listing_falls_back_to_rule_ids_without_a_tree() {
    let listed = list_skills("flutter", &[], &BTreeSet::new(), &rules());
    let names: Vec<&str> = listed.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(names, vec!["bloc", "go-router", "riverpod"]);
    assert!(listed.iter().all(|(_, s)| *s == DetectionStatus::NotDetected));
}

proptest! {
    #[test]
    fn reconciliation_is_idempotent(
        detected in prop::collection::btree_set(
            prop::sample::select(vec![
                "flutter_bloc",
                "bloc",
                "flutter_riverpod",
                "go_router",
                "http",
            ]),
            0..5,
        ),
        initially_excluded in prop::collection::vec(
            prop::sample::select(vec!["bloc", "riverpod", "go-router", "custom"]),
            0..4,
        ),
    ) {
        let detected: BTreeSet<String> = detected.into_iter().map(str::to_string).collect();
        let mut exclude: Vec<String> = Vec::new();
        for e in initially_excluded {
            if !exclude.iter().any(|x| x == e) {
                exclude.push(e.to_string());
            }
        }
        let mut cfg = config(vec![(
            "flutter",
            CategoryConfig { reference: None, include: None, exclude: Some(exclude) },
        )]);

        reconcile(&mut cfg, &detected, &rules());
        let after_first = cfg.clone();
        let second = reconcile(&mut cfg, &detected, &rules());

        prop_assert!(!second.changed());
        prop_assert_eq!(cfg, after_first);
    }
}
