//! File Scanner / Folder Hasher (spec §4.6).
//!
//! Parallel directory walk bounded by a concurrency limiter, exclusion
//! pipeline (built-in ignores then user globs), size/extension filtering, and
//! folder-hash early-exit so unchanged subtrees are skipped on re-scan.

use crate::config::IndexerConfig;
use crate::metadata::IndexMetadata;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_STAT_CONCURRENCY: usize = 50;

pub const INDEXABLE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts", "d.ts", "vue", "svelte",
];

pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    /// Directories whose folder hash changed (or was previously unknown) —
    /// the set that actually needed walking this pass.
    pub dirty_dirs: Vec<PathBuf>,
}

pub struct Scanner {
    excludes: GlobSet,
    extensions: HashSet<String>,
    max_file_size: u64,
    stat_concurrency: usize,
}

impl Scanner {
    pub fn new(cfg: &IndexerConfig) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pat in IndexerConfig::builtin_ignores() {
            if let Ok(glob) = Glob::new(&format!("**/{pat}/**")) {
                builder.add(glob);
            }
        }
        for pat in &cfg.exclude_patterns {
            if let Ok(glob) = Glob::new(pat) {
                builder.add(glob);
            }
        }
        let excludes = builder.build().unwrap_or_else(|_| GlobSet::empty());

        Self {
            excludes,
            extensions: INDEXABLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_file_size: cfg.max_indexed_file_size,
            stat_concurrency: DEFAULT_STAT_CONCURRENCY,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.is_match(path)
    }

    fn has_indexable_extension(&self, path: &Path) -> bool {
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".d.ts"))
        {
            return self.extensions.contains("d.ts");
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(ext))
    }

    /// Walk `root`, applying the folder-hash early-exit against `metadata`
    /// when `use_folder_hashing` is enabled. Returns the indexable files
    /// found and the list of directories whose hash changed (so the caller
    /// can persist the refreshed hashes back into `metadata`).
    pub async fn scan(
        &self,
        root: &Path,
        metadata: &mut IndexMetadata,
        use_folder_hashing: bool,
    ) -> ScanOutcome {
        let semaphore = Arc::new(Semaphore::new(self.stat_concurrency));
        let mut files = Vec::new();
        let mut dirty_dirs = Vec::new();
        self.walk_dir(root, root, metadata, use_folder_hashing, &semaphore, &mut files, &mut dirty_dirs)
            .await;
        ScanOutcome { files, dirty_dirs }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_dir<'a>(
        &'a self,
        root: &'a Path,
        dir: &'a Path,
        metadata: &'a mut IndexMetadata,
        use_folder_hashing: bool,
        semaphore: &'a Arc<Semaphore>,
        files: &'a mut Vec<PathBuf>,
        dirty_dirs: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
        Box::pin(async move {
            if self.is_excluded(dir) {
                return;
            }
            let _permit = semaphore.acquire().await.ok();

            let mut children = match tokio::fs::read_dir(dir).await {
                Ok(rd) => rd,
                Err(_) => return,
            };

            let mut entries: Vec<(String, std::fs::Metadata)> = Vec::new();
            while let Ok(Some(entry)) = children.next_entry().await {
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                let name = entry.file_name().to_string_lossy().to_string();
                entries.push((name, meta));
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let rel_dir = dir.strip_prefix(root).unwrap_or(dir).to_string_lossy().to_string();
            if use_folder_hashing {
                let hash = folder_signature(&entries);
                if metadata.folder_hash(&rel_dir) == Some(hash.as_str()) {
                    return; // unchanged subtree, skip entirely
                }
                metadata.set_folder_hash(rel_dir.clone(), hash);
                dirty_dirs.push(dir.to_path_buf());
            }

            for (name, meta) in entries {
                let child = dir.join(&name);
                if self.is_excluded(&child) {
                    continue;
                }
                if meta.is_dir() {
                    self.walk_dir(root, &child, metadata, use_folder_hashing, semaphore, files, dirty_dirs)
                        .await;
                } else if meta.is_file()
                    && meta.len() <= self.max_file_size
                    && self.has_indexable_extension(&child)
                {
                    files.push(child);
                }
            }
        })
    }
}

/// `sha256` over the sorted `(name, mtime, size)` tuples of a directory's
/// direct children (spec §9 "Folder-hash early-exit").
fn folder_signature(entries: &[(String, std::fs::Metadata)]) -> String {
    let mut hasher = Sha256::new();
    for (name, meta) in entries {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        hasher.update(name.as_bytes());
        hasher.update(mtime.to_le_bytes());
        hasher.update(meta.len().to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_finds_indexable_files_and_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
        std::fs::write(dir.path().join("src/a.png"), []).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.ts"), "x").unwrap();

        let cfg = IndexerConfig::default();
        let scanner = Scanner::new(&cfg);
        let mut metadata = IndexMetadata::default();
        let outcome = scanner.scan(dir.path(), &mut metadata, false).await;

        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].ends_with("src/a.ts"));
    }

    #[tokio::test]
    async fn folder_hashing_skips_unchanged_subtree_on_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();

        let cfg = IndexerConfig::default();
        let scanner = Scanner::new(&cfg);
        let mut metadata = IndexMetadata::default();

        let first = scanner.scan(dir.path(), &mut metadata, true).await;
        assert_eq!(first.files.len(), 1);
        assert_eq!(first.dirty_dirs.len(), 1);

        let second = scanner.scan(dir.path(), &mut metadata, true).await;
        assert!(second.dirty_dirs.is_empty());
        assert!(second.files.is_empty());
    }
}
