//! Registry locator parsing and the registry's published metadata.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::contract::RemoteTree;

pub const METADATA_PATH: &str = "skills/metadata.json";

/// Coordinates of a registry repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    pub owner: String,
    pub repo: String,
}

fn github_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)github\.com[/:]([^/\s]+)/([^/\s#?]+)").expect("static regex is valid")
    })
}

/// `None` for anything that is not a GitHub repository URL.
pub fn parse_registry_locator(url: &str) -> Option<RepoLocator> {
    let caps = github_pattern().captures(url)?;
    let owner = caps.get(1)?.as_str().to_string();
    let repo = caps.get(2)?.as_str();
    let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();
    if repo.is_empty() {
        return None;
    }
    Some(RepoLocator { owner, repo })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRelease {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tag_prefix: Option<String>,
}

/// Contents of `skills/metadata.json`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryRelease>,
}

impl RegistryMetadata {
    /// Release tag for a published category, `main` when it has no version.
    pub fn pinned_ref(&self, category: &str) -> Option<String> {
        let release = self.categories.get(category)?;
        Some(match &release.version {
            Some(version) => format!("{}{}", release.tag_prefix.as_deref().unwrap_or(""), version),
            None => crate::catalog::FALLBACK_REF.to_string(),
        })
    }
}

/// Reads the metadata document at `reference`. Missing or malformed metadata
/// is logged and treated as empty.
pub async fn fetch_metadata<R: RemoteTree + ?Sized>(
    remote: &R,
    locator: &RepoLocator,
    reference: &str,
) -> RegistryMetadata {
    let Some(raw) = remote
        .get_raw_file(&locator.owner, &locator.repo, reference, METADATA_PATH)
        .await
    else {
        debug!(
            owner = %locator.owner,
            repo = %locator.repo,
            reference,
            "Registry publishes no metadata"
        );
        return RegistryMetadata::default();
    };
    match serde_json::from_str(&raw) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(error = %e, "Registry metadata is not valid JSON, ignoring it");
            RegistryMetadata::default()
        }
    }
}
