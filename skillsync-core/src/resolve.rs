//! Resolution engine: turns a category's include/exclude directives and a
//! registry tree listing into the concrete skill bundles to fetch.
//!
//! A bundle lives at `skills/<category>/<skill>/...`. Include entries are parsed
//! once at the boundary into [`Include`]: a bare id is relative to the owning
//! category, `<category>/<skill>` and `<category>/*` reach into another
//! category. Relative entries filter the category's own candidates; absolute
//! entries are resolved independently and are never filtered by the owning
//! category's `exclude`.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::catalog::FALLBACK_REF;
use crate::config::Config;
use crate::contract::TreeEntry;
use crate::diagnostics::{Diagnostic, DiagnosticKind};

pub const SKILLS_ROOT: &str = "skills";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    Relative(String),
    Absolute { category: String, target: IncludeTarget },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeTarget {
    Skill(String),
    All,
}

impl Include {
    pub fn parse(raw: &str) -> Result<Include, String> {
        match raw.split_once('/') {
            None if raw.is_empty() => Err("empty include entry".to_string()),
            None => Ok(Include::Relative(raw.to_string())),
            Some((category, rest))
                if category.is_empty() || rest.is_empty() || rest.contains('/') =>
            {
                Err(format!(
                    "malformed include {raw:?}, expected <category>/<skill> or <category>/*"
                ))
            }
            Some((category, "*")) => Ok(Include::Absolute {
                category: category.to_string(),
                target: IncludeTarget::All,
            }),
            Some((category, skill)) => Ok(Include::Absolute {
                category: category.to_string(),
                target: IncludeTarget::Skill(skill.to_string()),
            }),
        }
    }
}

/// One skill bundle to fetch, with the ref to fetch it at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedSkillRef {
    pub category: String,
    pub skill: String,
    pub reference: String,
}

impl ResolvedSkillRef {
    pub fn key(&self) -> (&str, &str) {
        (&self.category, &self.skill)
    }

    /// Tree path prefix of the bundle, with trailing slash.
    pub fn prefix(&self) -> String {
        bundle_prefix(&self.category, &self.skill)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub refs: Vec<ResolvedSkillRef>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Appends `other`, dropping refs whose `(category, skill)` is already present.
    pub fn merge(&mut self, other: Resolution) {
        let mut seen: HashSet<(String, String)> = self
            .refs
            .iter()
            .map(|r| (r.category.clone(), r.skill.clone()))
            .collect();
        for r in other.refs {
            if seen.insert((r.category.clone(), r.skill.clone())) {
                self.refs.push(r);
            }
        }
        self.diagnostics.extend(other.diagnostics);
    }

    fn contains(&self, category: &str, skill: &str) -> bool {
        self.refs.iter().any(|r| r.key() == (category, skill))
    }
}

pub fn bundle_prefix(category: &str, skill: &str) -> String {
    format!("{SKILLS_ROOT}/{category}/{skill}/")
}

/// Distinct skill ids with at least one path below `skills/<category>/<id>/`.
pub fn candidate_skills(category: &str, entries: &[TreeEntry]) -> BTreeSet<String> {
    let prefix = format!("{SKILLS_ROOT}/{category}/");
    entries
        .iter()
        .filter_map(|e| e.path.strip_prefix(&prefix))
        .filter_map(|rest| rest.split_once('/'))
        .map(|(skill, _)| skill)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn skill_exists(category: &str, skill: &str, entries: &[TreeEntry]) -> bool {
    let prefix = bundle_prefix(category, skill);
    entries.iter().any(|e| e.path.starts_with(&prefix))
}

/// The ref a category is fetched at: its pin, else the repository default.
pub fn category_ref(config: &Config, category: &str, default_ref: &str) -> String {
    config
        .skills
        .get(category)
        .and_then(|c| c.reference.clone())
        .unwrap_or_else(|| default_ref.to_string())
}

fn is_path_safe_id(id: &str) -> bool {
    id != "." && id != ".." && !id.contains('\\')
}

/// Resolves one category against one tree snapshot.
pub fn resolve_category(
    category: &str,
    config: &Config,
    entries: &[TreeEntry],
    default_ref: &str,
) -> Resolution {
    let mut resolution = Resolution::default();
    let cat_config = config.skills.get(category).cloned().unwrap_or_default();
    let own_ref = category_ref(config, category, default_ref);

    let mut relative: Option<HashSet<String>> =
        cat_config.include.as_ref().map(|_| HashSet::new());
    let mut absolute = Vec::new();
    for raw in cat_config.include.iter().flatten() {
        match Include::parse(raw) {
            Ok(Include::Relative(id)) => {
                if let Some(set) = relative.as_mut() {
                    set.insert(id);
                }
            }
            Ok(Include::Absolute { category, target }) => absolute.push((category, target)),
            Err(problem) => resolution.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::MalformedInclude,
                format!("{category}: {problem}"),
            )),
        }
    }

    for skill in candidate_skills(category, entries) {
        if !is_path_safe_id(&skill) {
            resolution.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::InvalidSkillId,
                format!("Ignoring skill folder {skill:?} in {category}."),
            ));
            continue;
        }
        if relative.as_ref().is_some_and(|set| !set.contains(&skill)) {
            continue;
        }
        if cat_config.is_excluded(&skill) {
            continue;
        }
        resolution.refs.push(ResolvedSkillRef {
            category: category.to_string(),
            skill,
            reference: own_ref.clone(),
        });
    }

    for (target_category, target) in absolute {
        let reference = if config.skills.contains_key(&target_category) {
            category_ref(config, &target_category, default_ref)
        } else {
            own_ref.clone()
        };
        match target {
            IncludeTarget::Skill(skill) => {
                if resolution.contains(&target_category, &skill) {
                    continue;
                }
                if is_path_safe_id(&skill) && skill_exists(&target_category, &skill, entries) {
                    resolution.refs.push(ResolvedSkillRef {
                        category: target_category,
                        skill,
                        reference,
                    });
                } else {
                    resolution.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::MissingReference,
                        format!(
                            "Absolute include {target_category}/{skill} not found in repository."
                        ),
                    ));
                }
            }
            IncludeTarget::All => {
                let skills = candidate_skills(&target_category, entries);
                if skills.is_empty() {
                    resolution.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::EmptyWildcard,
                        format!("Absolute include {target_category}/* matched no skills."),
                    ));
                }
                for skill in skills.into_iter().filter(|s| is_path_safe_id(s)) {
                    if !resolution.contains(&target_category, &skill) {
                        resolution.refs.push(ResolvedSkillRef {
                            category: target_category.clone(),
                            skill,
                            reference: reference.clone(),
                        });
                    }
                }
            }
        }
    }

    debug!(category, resolved = resolution.refs.len(), "Resolved category");
    resolution
}

/// Resolves every requested category against a single tree snapshot and
/// deduplicates on `(category, skill)`, first occurrence wins.
pub fn resolve(
    categories: &[String],
    config: &Config,
    entries: &[TreeEntry],
    default_ref: Option<&str>,
) -> Resolution {
    let default_ref = default_ref.unwrap_or(FALLBACK_REF);
    let mut resolution = Resolution::default();
    for category in categories {
        resolution.merge(resolve_category(category, config, entries, default_ref));
    }
    resolution
}
