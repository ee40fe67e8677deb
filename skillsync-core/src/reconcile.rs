//! Reconciliation engine: keeps each category's `exclude` list in step with
//! the packages the project actually declares.
//!
//! Only `exclude` entries named by a detection rule are touched. Categories are
//! never added or removed and `include` is left alone.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::catalog::DetectionRegistry;
use crate::config::Config;
use crate::contract::TreeEntry;
use crate::resolve::candidate_skills;

/// What a reconciliation pass changed. Empty when the config was untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// `(category, skill)` removed from `exclude` because their packages appeared.
    pub reenabled: Vec<(String, String)>,
    /// `(category, skill)` added to `exclude` because none of their packages are used.
    pub disabled: Vec<(String, String)>,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        !self.reenabled.is_empty() || !self.disabled.is_empty()
    }

    pub fn reenabled_in(&self, category: &str) -> Vec<&str> {
        self.reenabled
            .iter()
            .filter(|(c, _)| c == category)
            .map(|(_, s)| s.as_str())
            .collect()
    }
}

fn rule_matches(packages: &[String], detected: &BTreeSet<String>) -> bool {
    packages.iter().any(|p| detected.contains(p))
}

/// Takes exclusive access to `config` for the pass and reports every mutation.
/// A second call with the same `detected` set changes nothing.
pub fn reconcile(
    config: &mut Config,
    detected: &BTreeSet<String>,
    registry: &DetectionRegistry,
) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    for (category, cat_config) in config.skills.iter_mut() {
        for rule in registry.rules_for(category) {
            let used = rule_matches(&rule.packages, detected);
            let excluded = cat_config.is_excluded(&rule.id);

            if !used && !excluded {
                cat_config.exclude.get_or_insert_with(Vec::new).push(rule.id.clone());
                outcome.disabled.push((category.clone(), rule.id.clone()));
            } else if used && excluded {
                if let Some(exclude) = cat_config.exclude.as_mut() {
                    exclude.retain(|e| e != &rule.id);
                }
                if cat_config.exclude.as_ref().is_some_and(Vec::is_empty) {
                    cat_config.exclude = None;
                }
                outcome.reenabled.push((category.clone(), rule.id.clone()));
            }
        }

        let reenabled = outcome.reenabled_in(category);
        if !reenabled.is_empty() {
            info!(
                "Dynamic re-detection: re-enabling [{}] in '{category}' category.",
                reenabled.join(", ")
            );
        }
    }

    debug!(
        reenabled = outcome.reenabled.len(),
        disabled = outcome.disabled.len(),
        "Reconciliation finished"
    );
    outcome
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    Detected,
    NotDetected,
    NoRule,
}

impl DetectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            DetectionStatus::Detected => "detected",
            DetectionStatus::NotDetected => "not-detected",
            DetectionStatus::NoRule => "no-rule",
        }
    }
}

pub fn detection_status(
    category: &str,
    skill: &str,
    detected: &BTreeSet<String>,
    registry: &DetectionRegistry,
) -> DetectionStatus {
    match registry.rule(category, skill) {
        Some(rule) if rule_matches(&rule.packages, detected) => DetectionStatus::Detected,
        Some(_) => DetectionStatus::NotDetected,
        None => DetectionStatus::NoRule,
    }
}

/// Sorted skills of a category with their detection status. Falls back to the
/// ids of the category's detection rules when the tree has none.
pub fn list_skills(
    category: &str,
    entries: &[TreeEntry],
    detected: &BTreeSet<String>,
    registry: &DetectionRegistry,
) -> Vec<(String, DetectionStatus)> {
    let mut skills = candidate_skills(category, entries);
    if skills.is_empty() {
        skills = registry.rules_for(category).iter().map(|r| r.id.clone()).collect();
    }
    skills
        .into_iter()
        .map(|skill| {
            let status = detection_status(category, &skill, detected, registry);
            (skill, status)
        })
        .collect()
}
