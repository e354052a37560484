//! Domain error types.
//!
//! Indexing-side failures never reach these as `Err` — per the error-handling
//! model, parse/IO problems during extraction become `FileRecord::is_skipped`
//! data (see [`crate::model::FileRecord::skipped`]). These enums cover the
//! boundary operations that do need a typed failure: git lookups, the
//! resolver's filesystem probing, and shard persistence.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{0} is not inside a git repository")]
    NotARepository(PathBuf),
    #[error("ref not found: {0}")]
    RefNotFound(String),
    #[error("git operation failed: {0}")]
    OperationFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for GitError {
    fn from(e: git2::Error) -> Self {
        GitError::OperationFailed(e.message().to_string())
    }
}

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("io error writing shard for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shard for {0} is corrupt: {1}")]
    Corrupt(PathBuf, serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("module specifier {0} could not be resolved from {1}")]
    Unresolvable(String, PathBuf),
    #[error("tsconfig at {0} is invalid: {1}")]
    InvalidTsconfig(PathBuf, serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Shard(#[from] ShardError),
    #[error("cancelled")]
    Cancelled,
}
