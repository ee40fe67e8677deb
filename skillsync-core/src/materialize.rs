//! Materializer: writes collected bundles into every configured agent root.
//!
//! Each file passes two gates before it is written:
//!
//! 1. the override gate: its project-relative path must not equal, or sit
//!    below, any `custom_overrides` entry;
//! 2. the containment gate: its resolved path must stay inside the bundle's
//!    skill directory. File names come from the registry and are not trusted.
//!
//! The override gate runs first. Failures of either gate, and I/O errors, are
//! reported per file and never abort the run.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::agent_definition;
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::download::CollectedBundle;

#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub written: Vec<PathBuf>,
    /// Project-relative paths skipped because of an override.
    pub overridden: Vec<String>,
    /// File names refused by the containment gate.
    pub rejected: Vec<String>,
    /// Agent roots that were processed.
    pub targets: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Materializer {
    project_root: PathBuf,
}

impl Materializer {
    /// Agent roots and overrides are interpreted relative to `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let project_root = if project_root.is_absolute() {
            project_root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&project_root))
                .unwrap_or(project_root)
        };
        Self {
            project_root: normalize_lexically(&project_root),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn write(&self, bundles: &[CollectedBundle], config: &Config) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let overrides: Vec<String> = config
            .custom_overrides
            .iter()
            .map(|o| normalize_override(o))
            .filter(|o| !o.is_empty())
            .collect();

        for definition in config.target_agents().into_iter().filter_map(agent_definition) {
            let Some(relative_root) = definition.path else {
                debug!(agent = %definition.id, "Agent has no skills directory, skipping");
                continue;
            };

            let root = self.project_root.join(relative_root);
            if let Err(e) = fs::create_dir_all(&root) {
                report.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::WriteFailed,
                    format!("Failed to create {}: {e}", root.display()),
                ));
                continue;
            }

            let resolved_root = resolve_for_write(&root);
            for bundle in bundles {
                self.write_bundle(&root, &resolved_root, bundle, &overrides, &mut report);
            }

            report.targets.push(root);
            report.diagnostics.push(Diagnostic::info(
                DiagnosticKind::TargetUpdated,
                format!("Updated {relative_root}/ ({})", definition.name),
            ));
        }

        report
    }

    fn write_bundle(
        &self,
        root: &Path,
        resolved_root: &Path,
        bundle: &CollectedBundle,
        overrides: &[String],
        report: &mut MaterializeReport,
    ) {
        let skill_dir = normalize_lexically(&root.join(&bundle.category).join(&bundle.skill));
        // Checked before anything is created, so a symlinked category or skill
        // directory cannot redirect even the directory creation.
        if !is_strictly_within(&resolve_for_write(&skill_dir), resolved_root) {
            report.rejected.push(format!("{}/{}", bundle.category, bundle.skill));
            report.diagnostics.push(Diagnostic::error(
                DiagnosticKind::PathEscape,
                format!(
                    "Security Error: Invalid skill directory {}/{}",
                    bundle.category, bundle.skill
                ),
            ));
            return;
        }
        if let Err(e) = fs::create_dir_all(&skill_dir) {
            report.diagnostics.push(Diagnostic::error(
                DiagnosticKind::WriteFailed,
                format!("Failed to create {}: {e}", skill_dir.display()),
            ));
            return;
        }
        let resolved_dir = resolve_for_write(&skill_dir);

        for file in &bundle.files {
            let target = normalize_lexically(&skill_dir.join(&file.name));

            let relative = self.relative_display(&target);
            if is_overridden(&relative, overrides) {
                report.diagnostics.push(Diagnostic::info(
                    DiagnosticKind::Overridden,
                    format!("Skipping overridden: {relative}"),
                ));
                report.overridden.push(relative);
                continue;
            }

            if !is_strictly_within(&resolve_for_write(&target), &resolved_dir) {
                report.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::PathEscape,
                    format!("Security Error: Invalid path {}", file.name),
                ));
                report.rejected.push(file.name.clone());
                continue;
            }

            let written = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::write(&target, &file.content));
            match written {
                Ok(()) => {
                    debug!(path = %target.display(), "Wrote file");
                    report.written.push(target);
                }
                Err(e) => report.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::WriteFailed,
                    format!("Failed to write {relative}: {e}"),
                )),
            }
        }
        info!(category = %bundle.category, skill = %bundle.skill, "Materialized bundle");
    }

    /// Forward-slash path of `target` relative to the project root.
    fn relative_display(&self, target: &Path) -> String {
        let shown = target.strip_prefix(&self.project_root).unwrap_or(target);
        shown
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
            .replace('\\', "/")
    }
}

/// Forward slashes, no leading `./`, no trailing `/`.
pub fn normalize_override(raw: &str) -> String {
    let mut normalized = raw.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized.trim_end_matches('/').to_string()
}

/// True when `relative` equals an override or lies below one.
pub fn is_overridden(relative: &str, overrides: &[String]) -> bool {
    overrides.iter().any(|o| {
        relative == o
            || relative
                .strip_prefix(o.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Resolves `.` and `..` without touching the filesystem. `..` never climbs
/// above a root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.as_os_str().is_empty() || out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalizes the longest existing ancestor of `path` and appends the rest,
/// so symlinks on the way are followed even though the file is not written yet.
fn resolve_for_write(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut existing = normalized.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

fn is_strictly_within(path: &Path, base: &Path) -> bool {
    path != base && path.starts_with(base)
}
