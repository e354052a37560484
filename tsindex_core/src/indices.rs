//! Inverted Indices (spec §4.4): lookups built over shard contents and
//! maintained incrementally — `apply_record` diffs the previous record for a
//! file against the new one and only touches the entries that changed.
//!
//! Names are matched case-sensitively; file paths are compared
//! case-insensitively (spec §4.4).

use crate::model::{FileRecord, Import, ReExport, Symbol};
use std::collections::{HashMap, HashSet};

fn path_key(path: &str) -> String {
    path.to_lowercase()
}

#[derive(Default)]
pub struct InvertedIndices {
    name_to_definitions: HashMap<String, Vec<Symbol>>,
    name_to_references: HashMap<String, Vec<crate::model::Reference>>,
    file_to_symbols: HashMap<String, Vec<Symbol>>,
    file_to_imports: HashMap<String, Vec<Import>>,
    file_to_reexports: HashMap<String, Vec<ReExport>>,
    /// Previous record per file, to compute deltas on re-insert.
    previous: HashMap<String, FileRecord>,
}

impl InvertedIndices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove everything this index knows about `uri`, then (if provided)
    /// insert the new record. Passing `None` models a file deletion.
    pub fn apply_record(&mut self, uri: &str, record: Option<FileRecord>) {
        let key = path_key(uri);
        if let Some(old) = self.previous.remove(&key) {
            self.retract(&old);
        }
        if let Some(new_record) = record {
            self.insert(&new_record);
            self.previous.insert(key, new_record);
        }
    }

    fn retract(&mut self, record: &FileRecord) {
        let key = path_key(&record.uri);
        self.file_to_symbols.remove(&key);
        self.file_to_imports.remove(&key);
        self.file_to_reexports.remove(&key);

        for symbol in &record.symbols {
            if let Some(defs) = self.name_to_definitions.get_mut(&symbol.name) {
                defs.retain(|s| s.id != symbol.id);
                if defs.is_empty() {
                    self.name_to_definitions.remove(&symbol.name);
                }
            }
        }
        for reference in &record.references {
            if let Some(refs) = self.name_to_references.get_mut(&reference.symbol_name) {
                refs.retain(|r| r.location.file != record.uri || r.location.position != reference.location.position);
                if refs.is_empty() {
                    self.name_to_references.remove(&reference.symbol_name);
                }
            }
        }
    }

    fn insert(&mut self, record: &FileRecord) {
        let key = path_key(&record.uri);
        self.file_to_symbols.insert(key.clone(), record.symbols.clone());
        self.file_to_imports.insert(key.clone(), record.imports.clone());
        self.file_to_reexports.insert(key.clone(), record.re_exports.clone());

        for symbol in &record.symbols {
            if symbol.is_definition {
                self.name_to_definitions.entry(symbol.name.clone()).or_default().push(symbol.clone());
            }
        }
        for reference in &record.references {
            self.name_to_references
                .entry(reference.symbol_name.clone())
                .or_default()
                .push(reference.clone());
        }
    }

    pub fn definitions(&self, name: &str) -> &[Symbol] {
        self.name_to_definitions.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn references(&self, name: &str) -> &[crate::model::Reference] {
        self.name_to_references.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn symbols_in_file(&self, uri: &str) -> &[Symbol] {
        self.file_to_symbols.get(&path_key(uri)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn imports_in_file(&self, uri: &str) -> &[Import] {
        self.file_to_imports.get(&path_key(uri)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn reexports_in_file(&self, uri: &str) -> &[ReExport] {
        self.file_to_reexports.get(&path_key(uri)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Files referencing a given symbol's name, excluding the file it was
    /// itself declared in — the lookup the dead-code analyzer uses. Derived
    /// live from `name_to_references` rather than a separately maintained
    /// reverse map, so it is correct regardless of whether the definition or
    /// its referrers were indexed first.
    pub fn referring_files(&self, symbol: &Symbol) -> HashSet<String> {
        self.name_to_references
            .get(&symbol.name)
            .into_iter()
            .flatten()
            .map(|r| path_key(&r.location.file))
            .filter(|f| f != &path_key(&symbol.file_path))
            .collect()
    }

    pub fn all_definition_names(&self) -> impl Iterator<Item = &str> {
        self.name_to_definitions.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{content_hash, Location, Position, Range, SymbolKind};

    fn def_symbol(file: &str, name: &str) -> Symbol {
        Symbol {
            id: format!("{file}:{name}"),
            name: name.to_string(),
            kind: SymbolKind::Function,
            location: Location {
                file: file.to_string(),
                position: Position::new(0, 0),
            },
            range: Range::default(),
            container_name: None,
            container_kind: None,
            full_container_path: None,
            is_static: None,
            parameters_count: Some(0),
            is_definition: true,
            is_exported: true,
            metadata: Default::default(),
            file_path: file.to_string(),
        }
    }

    fn record_with_def(file: &str, name: &str) -> FileRecord {
        FileRecord {
            uri: file.to_string(),
            content_hash: content_hash(name),
            shard_version: crate::model::SHARD_VERSION,
            symbols: vec![def_symbol(file, name)],
            references: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            pending_references: Vec::new(),
            is_skipped: false,
            skip_reason: None,
        }
    }

    #[test]
    fn insert_then_lookup_by_name() {
        let mut idx = InvertedIndices::new();
        idx.apply_record("/a.ts", Some(record_with_def("/a.ts", "calculateTotal")));
        assert_eq!(idx.definitions("calculateTotal").len(), 1);
    }

    #[test]
    fn retract_removes_stale_entries_on_reinsert() {
        let mut idx = InvertedIndices::new();
        idx.apply_record("/a.ts", Some(record_with_def("/a.ts", "oldName")));
        idx.apply_record("/a.ts", Some(record_with_def("/a.ts", "newName")));
        assert!(idx.definitions("oldName").is_empty());
        assert_eq!(idx.definitions("newName").len(), 1);
    }

    #[test]
    fn referring_files_sees_a_referrer_inserted_after_the_definition() {
        let mut idx = InvertedIndices::new();
        idx.apply_record("/util.ts", Some(record_with_def("/util.ts", "unusedHelper")));

        let def = &idx.definitions("unusedHelper")[0].clone();
        assert!(idx.referring_files(def).is_empty());

        let mut referrer = record_with_def("/app.ts", "unrelated");
        referrer.references.push(crate::model::Reference {
            symbol_name: "unusedHelper".to_string(),
            location: Location {
                file: "/app.ts".to_string(),
                position: Position::new(1, 0),
            },
            range: Range::default(),
            container_name: None,
            is_import: false,
            scope_id: String::new(),
            is_local: false,
        });
        idx.apply_record("/app.ts", Some(referrer));

        assert_eq!(idx.referring_files(def), ["/app.ts".to_string()].into_iter().collect());
    }

    #[test]
    fn deletion_clears_file_entries() {
        let mut idx = InvertedIndices::new();
        idx.apply_record("/a.ts", Some(record_with_def("/a.ts", "calculateTotal")));
        idx.apply_record("/a.ts", None);
        assert!(idx.definitions("calculateTotal").is_empty());
        assert!(idx.symbols_in_file("/a.ts").is_empty());
    }
}
