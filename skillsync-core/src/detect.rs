//! Local project scanning: declared packages, present agents and frameworks.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::catalog::{AgentDefinition, AgentId, FrameworkDefinition};
use crate::contract::DependencyDetector;

/// Keys of a pubspec dependency map that are not packages.
const PUBSPEC_NON_PACKAGES: [&str; 2] = ["flutter", "sdk"];

/// Reads `package.json` and `pubspec.yaml` in the project root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestDetector;

impl DependencyDetector for ManifestDetector {
    fn detect(&self, project_root: &Path) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        deps.extend(package_json_deps(&project_root.join("package.json")));
        deps.extend(pubspec_deps(&project_root.join("pubspec.yaml")));
        debug!(count = deps.len(), "Detected project dependencies");
        deps
    }
}

fn package_json_deps(path: &Path) -> Vec<String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let manifest: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Ignoring unparsable package.json");
            return Vec::new();
        }
    };
    ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| manifest.get(section)?.as_object())
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}

fn pubspec_deps(path: &Path) -> Vec<String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let manifest: serde_yaml::Value = match serde_yaml::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Ignoring unparsable pubspec.yaml");
            return Vec::new();
        }
    };
    ["dependencies", "dev_dependencies"]
        .iter()
        .filter_map(|section| manifest.get(section)?.as_mapping())
        .flat_map(|deps| deps.keys().filter_map(|k| k.as_str().map(str::to_string)))
        .filter(|name| !PUBSPEC_NON_PACKAGES.contains(&name.as_str()))
        .collect()
}

/// Agents whose marker files exist in the project, in catalog order.
pub fn detect_agents(project_root: &Path, catalog: &[AgentDefinition]) -> Vec<AgentId> {
    catalog
        .iter()
        .filter(|agent| agent.detection_files.iter().any(|f| project_root.join(f).exists()))
        .map(|agent| agent.id)
        .collect()
}

/// Frameworks present by marker file, or failing that by declared dependency.
pub fn detect_frameworks<'a>(
    project_root: &Path,
    deps: &BTreeSet<String>,
    catalog: &'a [FrameworkDefinition],
) -> Vec<&'a FrameworkDefinition> {
    catalog
        .iter()
        .filter(|framework| {
            framework.detection_files.iter().any(|f| project_root.join(f).exists())
                || framework.detection_dependencies.iter().any(|d| deps.contains(*d))
        })
        .collect()
}
