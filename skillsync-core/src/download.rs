//! Download step: fetches the files of every resolved skill bundle.
//!
//! Categories are processed one after another. Within a bundle all files are
//! downloaded concurrently through [`RemoteTree::download_files_concurrent`].
//! Tree listings are fetched once per distinct ref and reused for the rest of
//! the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::FALLBACK_REF;
use crate::config::Config;
use crate::contract::{EntryKind, FileTask, RemoteTree, TreeEntry, TreeListing};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::SyncError;
use crate::registry::{parse_registry_locator, RepoLocator};
use crate::resolve::{category_ref, resolve_category, ResolvedSkillRef};

/// Subdirectories of a bundle that are synced besides `SKILL.md`.
pub const BUNDLE_SUBDIRS: [&str; 3] = ["references/", "scripts/", "assets/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    /// Path relative to the bundle root, as listed by the registry.
    pub name: String,
    pub content: String,
}

/// Every fetched file of one skill, ready to materialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedBundle {
    pub category: String,
    pub skill: String,
    pub files: Vec<BundleFile>,
}

#[derive(Debug, Default)]
pub struct Assembly {
    pub bundles: Vec<CollectedBundle>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Whether a path relative to a bundle root is part of the bundle.
pub fn is_bundle_file(relative: &str) -> bool {
    relative == "SKILL.md" || BUNDLE_SUBDIRS.iter().any(|dir| relative.starts_with(dir))
}

/// Downloads one bundle. `None` when nothing eligible came back.
pub async fn collect_bundle<R: RemoteTree + ?Sized>(
    remote: &R,
    locator: &RepoLocator,
    skill_ref: &ResolvedSkillRef,
    entries: &[TreeEntry],
) -> Option<CollectedBundle> {
    let prefix = skill_ref.prefix();
    let tasks: Vec<FileTask> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Blob)
        .filter(|e| e.path.strip_prefix(&prefix).is_some_and(is_bundle_file))
        .map(|e| FileTask {
            owner: locator.owner.clone(),
            repo: locator.repo.clone(),
            reference: skill_ref.reference.clone(),
            path: e.path.clone(),
        })
        .collect();
    if tasks.is_empty() {
        debug!(
            category = %skill_ref.category,
            skill = %skill_ref.skill,
            "Bundle has no eligible files"
        );
        return None;
    }

    let order: Vec<String> = tasks.iter().map(|t| t.path.clone()).collect();
    let mut fetched: HashMap<String, String> = remote
        .download_files_concurrent(tasks)
        .await
        .into_iter()
        .map(|f| (f.path, f.content))
        .collect();

    let files: Vec<BundleFile> = order
        .into_iter()
        .filter_map(|path| {
            let content = fetched.remove(&path)?;
            Some(BundleFile {
                name: path[prefix.len()..].to_string(),
                content,
            })
        })
        .collect();
    if files.is_empty() {
        debug!(
            category = %skill_ref.category,
            skill = %skill_ref.skill,
            "Every download failed, dropping bundle"
        );
        return None;
    }

    info!(
        "+ Fetched {}/{} ({} files)",
        skill_ref.category,
        skill_ref.skill,
        files.len()
    );
    Some(CollectedBundle {
        category: skill_ref.category.clone(),
        skill: skill_ref.skill.clone(),
        files,
    })
}

struct TreeCache<'a, R: ?Sized> {
    remote: &'a R,
    locator: &'a RepoLocator,
    trees: HashMap<String, Option<Arc<TreeListing>>>,
}

impl<'a, R: RemoteTree + ?Sized> TreeCache<'a, R> {
    async fn at(&mut self, reference: &str) -> Option<Arc<TreeListing>> {
        if let Some(cached) = self.trees.get(reference) {
            return cached.clone();
        }
        let fetched = self
            .remote
            .get_repo_tree(&self.locator.owner, &self.locator.repo, reference)
            .await
            .map(Arc::new);
        self.trees.insert(reference.to_string(), fetched.clone());
        fetched
    }
}

/// The repository default ref, only looked up when some category is unpinned.
pub async fn default_ref<R: RemoteTree + ?Sized>(
    remote: &R,
    locator: &RepoLocator,
    categories: &[String],
    config: &Config,
) -> String {
    let needs_default = categories
        .iter()
        .chain(config.skills.keys())
        .any(|c| config.skills.get(c).map_or(true, |cat| cat.reference.is_none()));
    if !needs_default {
        return FALLBACK_REF.to_string();
    }
    remote
        .get_repo_info(&locator.owner, &locator.repo)
        .await
        .and_then(|info| info.default_ref)
        .unwrap_or_else(|| FALLBACK_REF.to_string())
}

/// Resolves and downloads every requested category.
///
/// Fails only on an unsupported registry; an unreachable category or ref is
/// reported and skipped.
pub async fn assemble<R: RemoteTree + ?Sized>(
    remote: &R,
    categories: &[String],
    config: &Config,
) -> Result<Assembly, SyncError> {
    let locator =
        parse_registry_locator(&config.registry).ok_or_else(|| SyncError::UnsupportedRegistry {
            registry: config.registry.clone(),
        })?;
    let default_ref = default_ref(remote, &locator, categories, config).await;

    let mut assembly = Assembly::default();
    let mut cache = TreeCache {
        remote,
        locator: &locator,
        trees: HashMap::new(),
    };
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for category in categories {
        let reference = category_ref(config, category, &default_ref);
        info!("- Discovering {category} ({reference})...");

        let Some(tree) = cache.at(&reference).await else {
            assembly.diagnostics.push(Diagnostic::error(
                DiagnosticKind::UnreachableCategory,
                format!("Failed to fetch {category}@{reference}."),
            ));
            continue;
        };

        let resolution = resolve_category(category, config, &tree.entries, &default_ref);
        assembly.diagnostics.extend(resolution.diagnostics);

        for skill_ref in resolution.refs {
            if !seen.insert((skill_ref.category.clone(), skill_ref.skill.clone())) {
                continue;
            }
            let source_tree = if skill_ref.reference == reference {
                Some(tree.clone())
            } else {
                cache.at(&skill_ref.reference).await
            };
            let Some(source_tree) = source_tree else {
                assembly.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::UnreachableCategory,
                    format!("Failed to fetch {}@{}.", skill_ref.category, skill_ref.reference),
                ));
                continue;
            };
            let bundle = collect_bundle(remote, &locator, &skill_ref, &source_tree.entries).await;
            if let Some(bundle) = bundle {
                assembly.bundles.push(bundle);
            }
        }
    }

    Ok(assembly)
}
