//! # contract: collaborator seams of the sync engine
//!
//! The engines never talk to a hosting service or scan a project themselves.
//! They consume two traits:
//!
//! - [`RemoteTree`]: lists a registry repository at a ref and fetches file
//!   contents. `None` and short result lists are normal outcomes, not errors;
//!   the engines turn them into diagnostics.
//! - [`DependencyDetector`]: reports which packages the local project declares.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so tests can script tree listings
//! and downloads without a repository on disk.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Metadata about the registry repository itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    pub default_ref: Option<String>,
}

/// Entry type in a flat tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    #[serde(other)]
    Other,
}

/// One path of a recursive listing, slash-delimited from the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Tree,
        }
    }
}

/// Flat listing of a repository at one ref.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    pub entries: Vec<TreeEntry>,
}

impl TreeListing {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }
}

/// A single file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub content: String,
}

/// Read access to the registry repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteTree: Send + Sync {
    /// `None` when the repository cannot be looked up.
    async fn get_repo_info(&self, owner: &str, repo: &str) -> Option<RepoInfo>;

    /// `None` when the repository is unreachable at `reference`.
    async fn get_repo_tree(&self, owner: &str, repo: &str, reference: &str) -> Option<TreeListing>;

    /// Content of one file, `None` when it cannot be fetched.
    async fn get_raw_file(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        path: &str,
    ) -> Option<String>;

    /// Fetches every task concurrently. Files that fail are left out of the
    /// result; the order of the result is not significant.
    async fn download_files_concurrent(&self, tasks: Vec<FileTask>) -> Vec<FetchedFile>;
}

/// Reports the package names a project declares.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DependencyDetector: Send + Sync {
    fn detect(&self, project_root: &Path) -> BTreeSet<String>;
}
