//! Persisted indexer metadata (spec §6 "Persisted state", §9 "Shard
//! atomicity"): `{version, lastGitHash, lastUpdatedAt, folderHashes}`, written
//! atomically (temp file + rename) next to the shards under `cacheDirectory`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const METADATA_VERSION: u32 = 1;
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_git_hash: Option<String>,
    pub last_updated_at: i64,
    /// directory (relative to workspace root) -> folder hash.
    pub folder_hashes: HashMap<String, String>,
}

impl Default for IndexMetadata {
    fn default() -> Self {
        Self {
            version: METADATA_VERSION,
            last_git_hash: None,
            last_updated_at: 0,
            folder_hashes: HashMap::new(),
        }
    }
}

impl IndexMetadata {
    fn path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(METADATA_FILE)
    }

    /// Load metadata, falling back to the "corrupt" recovery path from spec
    /// §7 item 8: `{version:1, lastUpdatedAt:0}` plus a scheduled full rebuild,
    /// signalled to the caller via the returned `needs_rebuild` flag.
    pub fn load(cache_dir: &Path) -> (Self, bool) {
        let path = Self::path(cache_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return (Self::default(), false),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(meta) => (meta, false),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "metadata.json corrupt, scheduling full rebuild");
                (Self::default(), true)
            }
        }
    }

    /// Atomic write: temp file in the same directory, then rename.
    pub fn save(&self, cache_dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let final_path = Self::path(cache_dir);
        let mut tmp = tempfile::NamedTempFile::new_in(cache_dir)?;
        let pretty = serde_json::to_string_pretty(self).expect("IndexMetadata always serializes");
        std::io::Write::write_all(&mut tmp, pretty.as_bytes())?;
        tmp.persist(final_path)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(())
    }

    pub fn folder_hash(&self, relative_dir: &str) -> Option<&str> {
        self.folder_hashes.get(relative_dir).map(String::as_str)
    }

    pub fn set_folder_hash(&mut self, relative_dir: String, hash: String) {
        self.folder_hashes.insert(relative_dir, hash);
    }

    pub fn invalidate_folder(&mut self, relative_dir: &str) {
        self.folder_hashes.remove(relative_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = IndexMetadata::default();
        meta.last_git_hash = Some("deadbeef".into());
        meta.set_folder_hash("src".into(), "abc123".into());
        meta.save(dir.path()).unwrap();

        let (loaded, needs_rebuild) = IndexMetadata::load(dir.path());
        assert!(!needs_rebuild);
        assert_eq!(loaded.last_git_hash.as_deref(), Some("deadbeef"));
        assert_eq!(loaded.folder_hash("src"), Some("abc123"));
    }

    #[test]
    fn missing_file_yields_default_without_rebuild_flag() {
        let dir = tempfile::tempdir().unwrap();
        let (meta, needs_rebuild) = IndexMetadata::load(dir.path());
        assert_eq!(meta.version, METADATA_VERSION);
        assert!(!needs_rebuild);
    }

    #[test]
    fn corrupt_file_triggers_rebuild_flag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"{not json").unwrap();
        let (meta, needs_rebuild) = IndexMetadata::load(dir.path());
        assert_eq!(meta.last_updated_at, 0);
        assert!(needs_rebuild);
    }
}
