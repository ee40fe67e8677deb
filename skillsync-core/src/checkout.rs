use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::process::Command;

use crate::contract::{
    EntryKind, FetchedFile, FileTask, RemoteTree, RepoInfo, TreeEntry, TreeListing,
};

/// [`RemoteTree`] backed by a local clone of the registry repository.
///
/// Every call shells out to `git`; owner and repo are implied by the clone and
/// only logged. Refs resolve as given first, then as `origin/<ref>`.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    repo_dir: PathBuf,
}

impl GitCheckout {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn git(&self, args: &[&str]) -> Option<Vec<u8>> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => Some(out.stdout),
            Ok(out) => {
                tracing::debug!(
                    path = %self.repo_dir.display(),
                    ?args,
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "Git exited with non-zero code"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    path = %self.repo_dir.display(),
                    "Failed to launch git process"
                );
                None
            }
        }
    }

    async fn git_text(&self, args: &[&str]) -> Option<String> {
        let stdout = self.git(args).await?;
        let text = String::from_utf8(stdout).ok()?;
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Commit id for `reference`, trying the remote-tracking branch second.
    async fn resolve_rev(&self, reference: &str) -> Option<String> {
        if reference.is_empty() || reference.starts_with('-') {
            tracing::error!(reference, "Refusing suspicious ref");
            return None;
        }
        for candidate in [reference.to_string(), format!("origin/{reference}")] {
            let revision = format!("{candidate}^{{commit}}");
            if let Some(rev) = self
                .git_text(&["rev-parse", "--verify", "--quiet", &revision])
                .await
            {
                return Some(rev);
            }
        }
        tracing::error!(
            reference,
            path = %self.repo_dir.display(),
            "Unknown ref in registry checkout"
        );
        None
    }
}

/// Parses `git ls-tree -z` output: `<mode> <type> <object>\t<path>\0`.
pub fn parse_ls_tree(raw: &[u8]) -> Vec<TreeEntry> {
    raw.split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let record = std::str::from_utf8(record).ok()?;
            let (meta, path) = record.split_once('\t')?;
            let kind = match meta.split(' ').nth(1)? {
                "blob" => EntryKind::Blob,
                "tree" => EntryKind::Tree,
                _ => EntryKind::Other,
            };
            Some(TreeEntry {
                path: path.to_string(),
                kind,
            })
        })
        .collect()
}

#[async_trait]
impl RemoteTree for GitCheckout {
    async fn get_repo_info(&self, owner: &str, repo: &str) -> Option<RepoInfo> {
        tracing::debug!(owner, repo, path = %self.repo_dir.display(), "Reading default branch");
        self.git(&["rev-parse", "--git-dir"]).await?;
        let default_ref = match self
            .git_text(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .await
        {
            Some(remote_head) => Some(
                remote_head
                    .strip_prefix("origin/")
                    .unwrap_or(&remote_head)
                    .to_string(),
            ),
            None => self
                .git_text(&["rev-parse", "--abbrev-ref", "HEAD"])
                .await
                .filter(|head| head != "HEAD"),
        };
        Some(RepoInfo { default_ref })
    }

    async fn get_repo_tree(&self, owner: &str, repo: &str, reference: &str) -> Option<TreeListing> {
        tracing::debug!(owner, repo, reference, "Listing registry tree");
        let rev = self.resolve_rev(reference).await?;
        let raw = self
            .git(&["ls-tree", "-r", "-t", "-z", "--full-tree", &rev])
            .await?;
        let entries = parse_ls_tree(&raw);
        tracing::info!(reference, entries = entries.len(), "Listed registry tree");
        Some(TreeListing { entries })
    }

    async fn get_raw_file(
        &self,
        _owner: &str,
        _repo: &str,
        reference: &str,
        path: &str,
    ) -> Option<String> {
        let rev = self.resolve_rev(reference).await?;
        let object = format!("{rev}:{path}");
        let raw = self.git(&["show", &object]).await?;
        match String::from_utf8(raw) {
            Ok(content) => Some(content),
            Err(_) => {
                tracing::warn!(path, reference, "Registry file is not UTF-8, skipping");
                None
            }
        }
    }

    async fn download_files_concurrent(&self, tasks: Vec<FileTask>) -> Vec<FetchedFile> {
        let downloads = tasks.into_iter().map(|task| async move {
            let content = self
                .get_raw_file(&task.owner, &task.repo, &task.reference, &task.path)
                .await?;
            Some(FetchedFile {
                path: task.path,
                content,
            })
        });
        join_all(downloads).await.into_iter().flatten().collect()
    }
}
