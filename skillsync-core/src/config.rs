//! The declarative `.skillsrc` configuration and its store.
//!
//! The file is YAML, edited by hand. [`ConfigStore::load`] is the single place
//! where it is parsed and validated; everything downstream works with the typed
//! [`Config`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{AgentId, FALLBACK_REF};
use crate::error::ConfigError;
use crate::registry::RegistryMetadata;

pub const CONFIG_FILE_NAME: &str = ".skillsrc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub registry: String,
    /// Targets to materialize into. Absent means every supported agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentId>>,
    pub skills: BTreeMap<String, CategoryConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_overrides: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Pinned tag, branch or commit. Absent means the repository default.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl CategoryConfig {
    pub fn pinned(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn is_excluded(&self, skill: &str) -> bool {
        self.exclude
            .as_deref()
            .is_some_and(|ex| ex.iter().any(|e| e == skill))
    }
}

impl Config {
    pub fn target_agents(&self) -> Vec<AgentId> {
        match &self.agents {
            Some(agents) => agents.clone(),
            None => AgentId::ALL.to_vec(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            registry = %self.registry,
            categories = self.skills.len(),
            overrides = self.custom_overrides.len(),
            "Loaded config"
        );
        debug!(?self, "Config loaded (full debug)");
    }

    /// Checks everything serde cannot express. Collects every problem rather
    /// than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if !is_http_url(&self.registry) {
            problems.push(format!("registry {:?} is not an http(s) URL", self.registry));
        }

        if let Some(agents) = &self.agents {
            for (i, agent) in agents.iter().enumerate() {
                if agents[..i].contains(agent) {
                    problems.push(format!("agent {agent} is listed more than once"));
                }
            }
        }

        for (category, cat) in &self.skills {
            let plain = !category.is_empty()
                && !category.contains('/')
                && category != "."
                && category != "..";
            if !plain {
                problems.push(format!("category name {category:?} is not a plain name"));
            }
            for entry in cat.include.iter().flatten() {
                if let Some(problem) = include_problem(entry) {
                    problems.push(format!("{category}.include {entry:?}: {problem}"));
                }
            }
            for entry in cat.exclude.iter().flatten() {
                if entry.is_empty() || entry.contains('/') {
                    problems.push(format!(
                        "{category}.exclude {entry:?}: exclude entries must be plain skill ids"
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

fn is_http_url(raw: &str) -> bool {
    let rest = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or("");
            !host.is_empty() && !raw.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn include_problem(entry: &str) -> Option<&'static str> {
    if entry.is_empty() {
        return Some("empty entry");
    }
    match entry.split_once('/') {
        None => None,
        Some((cat, rest)) if cat.is_empty() || rest.is_empty() => {
            Some("absolute entries must look like <category>/<skill> or <category>/*")
        }
        Some((_, rest)) if rest.contains('/') => Some("absolute entries have exactly one '/'"),
        Some(_) => None,
    }
}

/// Reads and writes `.skillsrc` in one project.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            path: project_root.as_ref().join(CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(&self) -> Result<Option<Config>, ConfigError> {
        if !self.path.exists() {
            debug!(config_path = ?self.path, "No config file present");
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        config.validate()?;
        config.trace_loaded();
        Ok(Some(config))
    }

    /// Writes the config, keeping any comment block that heads the current file.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let body = serde_yaml::to_string(config).map_err(ConfigError::Serialize)?;
        let header = fs::read_to_string(&self.path)
            .map(|existing| leading_comments(&existing))
            .unwrap_or_default();
        fs::write(&self.path, format!("{header}{body}")).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(config_path = ?self.path, "Saved config");
        Ok(())
    }
}

fn leading_comments(content: &str) -> String {
    let mut header = String::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.is_empty() {
            header.push_str(line);
            header.push('\n');
        } else {
            break;
        }
    }
    header
}

/// The config `init` writes: the chosen framework pinned to its released
/// version, plus `common` when the registry publishes it.
pub fn build_initial_config(
    framework: &str,
    agents: Vec<AgentId>,
    registry: &str,
    metadata: &RegistryMetadata,
) -> Config {
    let mut skills = BTreeMap::new();
    skills.insert(
        framework.to_string(),
        CategoryConfig::pinned(
            metadata
                .pinned_ref(framework)
                .unwrap_or_else(|| FALLBACK_REF.to_string()),
        ),
    );
    if framework != "common" {
        if let Some(common_ref) = metadata.pinned_ref("common") {
            skills.insert("common".to_string(), CategoryConfig::pinned(common_ref));
        }
    }
    Config {
        registry: registry.to_string(),
        agents: Some(agents),
        skills,
        custom_overrides: Vec::new(),
        feedback_url: None,
    }
}
