//! Top-level orchestrator (spec §4, §5, §6): wires the scanner, worker pool,
//! shard store, inverted indices, git integration and metadata persistence
//! into a single indexing pipeline, and exposes the request-handler surface
//! on top of [`MergedIndex`].

use crate::cancellation::CancellationToken;
use crate::config::{cache_dir, IndexerConfig};
use crate::git::GitRepo;
use crate::merged_index::{MergedIndex, RankingContext, StaticIndex};
use crate::metadata::IndexMetadata;
use crate::model::FileRecord;
use crate::resolver::ImportResolver;
use crate::scanner::Scanner;
use crate::shard_store::ShardStore;
use crate::worker_pool::{ProgressFn, WorkItem, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct IndexStats {
    pub files: usize,
    pub symbols: usize,
    pub shards: usize,
}

pub struct Indexer {
    pub root: PathBuf,
    pub config: IndexerConfig,
    pub shards: ShardStore,
    pub merged: MergedIndex,
    pub metadata: Mutex<IndexMetadata>,
    pub git: Option<GitRepo>,
    resolver: ImportResolver,
    worker_count: AtomicUsize,
    cache_directory: PathBuf,
}

impl Indexer {
    pub fn new(root: PathBuf, config: IndexerConfig) -> Self {
        let cache_directory = cache_dir(&root, &config);
        let (metadata, needs_rebuild) = IndexMetadata::load(&cache_directory);
        if needs_rebuild {
            tracing::warn!(dir = %cache_directory.display(), "metadata corrupt, scheduling full rebuild");
        }

        let static_index = if config.static_index.enabled {
            config
                .static_index
                .path
                .as_ref()
                .and_then(|p| StaticIndex::load(Path::new(p)).ok())
                .unwrap_or_else(StaticIndex::empty)
        } else {
            StaticIndex::empty()
        };

        let git = if config.enable_git_integration { GitRepo::discover(&root) } else { None };
        let resolver = ImportResolver::new(&root);

        Self {
            worker_count: AtomicUsize::new(config.max_concurrent_workers.clamp(2, 8)),
            shards: ShardStore::new(),
            merged: MergedIndex::new(static_index),
            metadata: Mutex::new(metadata),
            git,
            resolver,
            root,
            config,
            cache_directory,
        }
    }

    pub fn resolver(&self) -> &ImportResolver {
        &self.resolver
    }

    pub fn stats(&self) -> IndexStats {
        let s = self.shards.stats();
        IndexStats {
            files: s.files,
            symbols: s.symbols,
            shards: s.shards,
        }
    }

    pub fn ranking_context(&self, current_file: Option<String>) -> RankingContext {
        RankingContext {
            current_file,
            open_files: self.merged.overlay.all().into_iter().map(|r| r.uri).collect(),
        }
    }

    /// Full or incremental workspace scan + index pass (spec §4.6, §4.7).
    /// Uses the git HEAD-diff fast path when available and `lastGitHash` is
    /// known; otherwise falls back to a full folder-hashed scan.
    pub async fn index_workspace(&self, token: CancellationToken, on_progress: Option<ProgressFn>) {
        if let Some(repo) = &self.git {
            let head = repo.head_hash().ok();
            let last = self.metadata.lock().expect("metadata lock poisoned").last_git_hash.clone();
            if let (Some(head), Some(last)) = (&head, &last) {
                if head == last {
                    tracing::debug!("workspace unchanged since last index (git HEAD match)");
                    return;
                }
                if let Ok(changes) = repo.changed_files(last, head) {
                    self.apply_change_set(&changes, &token, on_progress).await;
                    self.metadata.lock().expect("metadata lock poisoned").last_git_hash = Some(head.clone());
                    self.persist_metadata();
                    return;
                }
            }
            if let Some(head) = head {
                self.metadata.lock().expect("metadata lock poisoned").last_git_hash = Some(head);
            }
        }

        self.full_scan_and_index(token, on_progress).await;
        self.persist_metadata();
    }

    async fn apply_change_set(
        &self,
        changes: &crate::git::ChangeSet,
        token: &CancellationToken,
        on_progress: Option<ProgressFn>,
    ) {
        for deleted in &changes.deleted {
            self.remove_file(&deleted.to_string_lossy());
        }
        let mut items = Vec::new();
        for path in changes.added.iter().chain(changes.modified.iter()) {
            items.push(WorkItem {
                uri: path.to_string_lossy().to_string(),
                content: None,
            });
        }
        self.run_and_apply(items, token.clone(), on_progress).await;
    }

    async fn full_scan_and_index(&self, token: CancellationToken, on_progress: Option<ProgressFn>) {
        let scanner = Scanner::new(&self.config);
        let mut metadata = self.metadata.lock().expect("metadata lock poisoned").clone();
        let outcome = scanner.scan(&self.root, &mut metadata, self.config.indexing.use_folder_hashing).await;
        *self.metadata.lock().expect("metadata lock poisoned") = metadata;

        let items = outcome
            .files
            .into_iter()
            .map(|p| WorkItem {
                uri: p.to_string_lossy().to_string(),
                content: None,
            })
            .collect();
        self.run_and_apply(items, token, on_progress).await;
    }

    async fn run_and_apply(&self, items: Vec<WorkItem>, token: CancellationToken, on_progress: Option<ProgressFn>) {
        if items.is_empty() {
            return;
        }
        let total = items.len();
        let start = std::time::Instant::now();
        let worker_count = self.worker_count.load(Ordering::Relaxed);
        let pool = WorkerPool::new(worker_count);

        let records = pool.run(items, token, on_progress).await;
        for record in records {
            self.apply_record(record);
        }

        let elapsed_ms = start.elapsed().as_millis() as f64;
        let avg = if total > 0 { elapsed_ms / total as f64 } else { 0.0 };
        let next = WorkerPool::next_worker_count(worker_count, avg);
        self.worker_count.store(next, Ordering::Relaxed);
    }

    fn apply_record(&self, record: FileRecord) {
        self.merged.shards.lock().expect("shard index lock poisoned").apply_record(&record.uri, Some(record.clone()));
        self.shards.put(record);
    }

    pub fn remove_file(&self, uri: &str) {
        self.shards.delete(uri);
        self.merged.shards.lock().expect("shard index lock poisoned").apply_record(uri, None);
    }

    fn persist_metadata(&self) {
        let metadata = self.metadata.lock().expect("metadata lock poisoned");
        if let Err(err) = metadata.save(&self.cache_directory) {
            tracing::warn!(error = %err, "failed to persist index metadata");
        }
    }

    pub fn clear_cache(&self) {
        self.shards.clear();
        *self.merged.shards.lock().expect("shard index lock poisoned") = crate::indices::InvertedIndices::new();
        *self.metadata.lock().expect("metadata lock poisoned") = IndexMetadata::default();
        self.persist_metadata();
    }
}
