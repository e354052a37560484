//! Git integration (spec §4.7): detect the repo, read HEAD, and diff two
//! hashes into an `{added, modified, deleted}` change set used both for the
//! incremental catch-up at startup and under a HEAD-change watcher.

use crate::errors::GitError;
use git2::{DiffOptions, Oid, Repository};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl GitRepo {
    /// Detect a repository containing `path`. Absence is not an error — spec
    /// §4.7: "if absent, full background indexing is performed" — callers
    /// check for `None`, not an `Err`.
    pub fn discover(path: &Path) -> Option<Self> {
        let repo = Repository::discover(path).ok()?;
        let root = repo.workdir()?.to_path_buf();
        Some(Self { repo, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn head_hash(&self) -> Result<String, GitError> {
        let head = self.repo.head().map_err(GitError::from)?;
        let oid = head
            .target()
            .ok_or_else(|| GitError::RefNotFound("HEAD".to_string()))?;
        Ok(oid.to_string())
    }

    fn resolve(&self, reference: &str) -> Result<Oid, GitError> {
        if let Ok(oid) = Oid::from_str(reference) {
            if self.repo.find_commit(oid).is_ok() {
                return Ok(oid);
            }
        }
        self.repo
            .revparse_single(reference)
            .map(|obj| obj.id())
            .map_err(|_| GitError::RefNotFound(reference.to_string()))
    }

    /// Diff two commit-ish refs into an indexer-shaped change set. Renames
    /// are reported as a delete of the old path plus an add of the new one —
    /// the indexer has no notion of rename-preserving identity.
    pub fn changed_files(&self, from: &str, to: &str) -> Result<ChangeSet, GitError> {
        let from_oid = self.resolve(from)?;
        let to_oid = self.resolve(to)?;

        let from_tree = self.repo.find_commit(from_oid)?.tree()?;
        let to_tree = self.repo.find_commit(to_oid)?.tree()?;

        let mut opts = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))?;

        let mut changes = ChangeSet::default();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().map(|p| self.root.join(p));
            let new_path = delta.new_file().path().map(|p| self.root.join(p));
            match delta.status() {
                git2::Delta::Added => {
                    if let Some(p) = new_path {
                        changes.added.push(p);
                    }
                }
                git2::Delta::Deleted => {
                    if let Some(p) = old_path {
                        changes.deleted.push(p);
                    }
                }
                git2::Delta::Renamed => {
                    if let Some(p) = old_path {
                        changes.deleted.push(p);
                    }
                    if let Some(p) = new_path {
                        changes.added.push(p);
                    }
                }
                _ => {
                    if let Some(p) = new_path.or(old_path) {
                        changes.modified.push(p);
                    }
                }
            }
        }
        Ok(changes)
    }

    /// Changes between the working tree and a reference (used when the
    /// workspace has uncommitted edits on top of `lastGitHash`).
    pub fn working_tree_changes(&self, from: &str) -> Result<ChangeSet, GitError> {
        let from_oid = self.resolve(from)?;
        let from_tree = self.repo.find_commit(from_oid)?.tree()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(true);
        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&from_tree), Some(&mut opts))?;

        let mut changes = ChangeSet::default();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().map(|p| self.root.join(p));
            let new_path = delta.new_file().path().map(|p| self.root.join(p));
            match delta.status() {
                git2::Delta::Added | git2::Delta::Untracked => {
                    if let Some(p) = new_path {
                        changes.added.push(p);
                    }
                }
                git2::Delta::Deleted => {
                    if let Some(p) = old_path {
                        changes.deleted.push(p);
                    }
                }
                _ => {
                    if let Some(p) = new_path.or(old_path) {
                        changes.modified.push(p);
                    }
                }
            }
        }
        Ok(changes)
    }
}
