//! Indexer configuration (spec §6 "Initialization options").
//!
//! `IndexerConfig` is the typed destination `initializationOptions` JSON is
//! deserialized into by the LSP adapter; this crate never parses a
//! configuration file format of its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_cache_directory() -> String {
    ".smart-index".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_indexed_file_size() -> u64 {
    1024 * 1024
}

fn default_max_concurrent_workers() -> usize {
    4
}

fn default_batch_size() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextIndexingConfig {
    pub enabled: bool,
    /// File extensions handled by pattern-based (non-AST) indexing.
    pub languages: Vec<String>,
}

impl Default for TextIndexingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            languages: vec!["java", "go", "cs", "py", "rs", "c", "cpp", "h", "hpp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticIndexConfig {
    pub enabled: bool,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexingConfig {
    pub use_folder_hashing: bool,
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            use_folder_hashing: true,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexerConfig {
    #[serde(default = "default_cache_directory")]
    pub cache_directory: String,
    #[serde(default = "default_true")]
    pub enable_git_integration: bool,
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_max_indexed_file_size")]
    pub max_indexed_file_size: u64,
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_index_jobs: usize,
    #[serde(default = "default_true")]
    pub enable_background_index: bool,
    pub text_indexing: TextIndexingConfig,
    pub static_index: StaticIndexConfig,
    pub indexing: IndexingConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            cache_directory: default_cache_directory(),
            enable_git_integration: true,
            exclude_patterns: Vec::new(),
            max_indexed_file_size: default_max_indexed_file_size(),
            max_concurrent_workers: default_max_concurrent_workers(),
            max_concurrent_index_jobs: default_max_concurrent_workers(),
            enable_background_index: true,
            text_indexing: TextIndexingConfig::default(),
            static_index: StaticIndexConfig::default(),
            indexing: IndexingConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Deserialize `initializationOptions`, falling back to defaults
    /// field-by-field on any parse failure (spec §7 item 7: "apply defaults,
    /// emit a warning").
    pub fn from_json(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "invalid initializationOptions, using defaults");
                Self::default()
            }
        }
    }

    pub fn builtin_ignores() -> &'static [&'static str] {
        &[
            "node_modules",
            ".git",
            ".hg",
            ".svn",
            "dist",
            "build",
            "out",
            "coverage",
            ".next",
            ".turbo",
        ]
    }
}

/// Resolve and lazily create the cache directory relative to the workspace
/// root, creating it on first use.
pub fn cache_dir(workspace_root: &Path, cfg: &IndexerConfig) -> PathBuf {
    let dir = workspace_root.join(&cfg.cache_directory);
    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
    }
    dir
}
