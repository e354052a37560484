//! Shard Store (spec §4.3): one [`FileRecord`] per file, keyed by absolute
//! path. Backed by `dashmap` so reads never block on a writer and a writer
//! replacing a shard never exposes a partial record — each `insert` swaps in
//! a whole new `Arc<FileRecord>` atomically.

use crate::model::{FileRecord, SHARD_VERSION};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ShardStoreStats {
    pub files: usize,
    pub symbols: usize,
    pub shards: usize,
}

/// Key-value surface over `FileRecord`s, keyed by absolute file path.
pub struct ShardStore {
    shards: DashMap<String, Arc<FileRecord>>,
}

impl ShardStore {
    pub fn new() -> Self {
        Self { shards: DashMap::new() }
    }

    pub fn get(&self, uri: &str) -> Option<Arc<FileRecord>> {
        let record = self.shards.get(uri)?.value().clone();
        if record.is_stale() { None } else { Some(record) }
    }

    /// Replace the shard for `uri`. Skips the write entirely when the
    /// incoming hash matches the stored one (spec §4.3, §8: "records with
    /// hash equal to the current file hash are not rewritten").
    pub fn put(&self, record: FileRecord) {
        if let Some(existing) = self.shards.get(&record.uri) {
            if existing.content_hash == record.content_hash && !existing.is_stale() {
                return;
            }
        }
        self.shards.insert(record.uri.clone(), Arc::new(record));
    }

    pub fn delete(&self, uri: &str) -> Option<Arc<FileRecord>> {
        self.shards.remove(uri).map(|(_, v)| v)
    }

    pub fn all_uris(&self) -> Vec<String> {
        self.shards.iter().map(|e| e.key().clone()).collect()
    }

    pub fn all_records(&self) -> Vec<Arc<FileRecord>> {
        self.shards.iter().map(|e| e.value().clone()).collect()
    }

    /// Candidate files whose references include `name`, or whose imports
    /// bind `name` under a local alias (`import { name as other }` only ever
    /// produces references named `other`, never `name`), optionally narrowed
    /// to files that import from a module whose basename matches
    /// `file_basename` (spec §4.3, used by Find-References step 3).
    pub fn find_reference_candidates(
        &self,
        name: &str,
        file_basename: Option<&str>,
        limit: usize,
    ) -> Vec<Arc<FileRecord>> {
        let mut out = Vec::new();
        for entry in self.shards.iter() {
            if out.len() >= limit {
                break;
            }
            let record = entry.value();
            let has_ref = record.references.iter().any(|r| r.symbol_name == name);
            let has_renamed_import = record.imports.iter().any(|i| i.exported_name.as_deref() == Some(name));
            if !has_ref && !has_renamed_import {
                continue;
            }
            if let Some(basename) = file_basename {
                let imports_match = record.imports.iter().any(|i| module_basename(&i.module_specifier) == basename);
                if !imports_match {
                    continue;
                }
            }
            out.push(record.clone());
        }
        out
    }

    pub fn stats(&self) -> ShardStoreStats {
        let mut stats = ShardStoreStats::default();
        for entry in self.shards.iter() {
            stats.files += 1;
            stats.shards += 1;
            stats.symbols += entry.value().symbols.len();
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn clear(&self) {
        self.shards.clear();
    }
}

impl Default for ShardStore {
    fn default() -> Self {
        Self::new()
    }
}

fn module_basename(specifier: &str) -> String {
    specifier
        .rsplit('/')
        .next()
        .unwrap_or(specifier)
        .trim_end_matches(".ts")
        .trim_end_matches(".tsx")
        .trim_end_matches(".js")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, Position, Range, Reference};

    fn sample(uri: &str, hash: &str, name: &str) -> FileRecord {
        FileRecord {
            uri: uri.to_string(),
            content_hash: hash.to_string(),
            shard_version: SHARD_VERSION,
            symbols: Vec::new(),
            references: vec![Reference {
                symbol_name: name.to_string(),
                location: Location {
                    file: uri.to_string(),
                    position: Position::new(0, 0),
                },
                range: Range::default(),
                container_name: None,
                is_import: false,
                scope_id: String::new(),
                is_local: false,
            }],
            imports: Vec::new(),
            re_exports: Vec::new(),
            pending_references: Vec::new(),
            is_skipped: false,
            skip_reason: None,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = ShardStore::new();
        store.put(sample("/a.ts", "h1", "calculateTotal"));
        assert!(store.get("/a.ts").is_some());
    }

    #[test]
    fn hash_equal_put_does_not_rewrite() {
        let store = ShardStore::new();
        store.put(sample("/a.ts", "h1", "calculateTotal"));
        let before = store.get("/a.ts").unwrap();
        store.put(sample("/a.ts", "h1", "calculateTotal"));
        let after = store.get("/a.ts").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn find_reference_candidates_filters_by_name() {
        let store = ShardStore::new();
        store.put(sample("/a.ts", "h1", "calculateTotal"));
        store.put(sample("/b.ts", "h2", "other"));
        let candidates = store.find_reference_candidates("calculateTotal", None, 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].uri, "/a.ts");
    }

    #[test]
    fn find_reference_candidates_includes_files_that_only_rename_the_import() {
        use crate::model::Import;

        let store = ShardStore::new();
        let mut renamed = sample("/app.ts", "h1", "calcTotal");
        renamed.imports.push(Import {
            local_name: "calcTotal".to_string(),
            module_specifier: "./util".to_string(),
            is_default: false,
            is_namespace: false,
            exported_name: Some("calculateTotal".to_string()),
            location: Location {
                file: "/app.ts".to_string(),
                position: Position::new(0, 0),
            },
        });
        store.put(renamed);

        let candidates = store.find_reference_candidates("calculateTotal", None, 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].uri, "/app.ts");
    }
}
