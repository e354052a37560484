//! Merged Index (spec §4.5): a single query surface over the overlay (open,
//! unsaved documents), the persisted shards, and an optional static index,
//! with precedence `overlay > shards > static` on name collisions.

use crate::indices::InvertedIndices;
use crate::model::{FileRecord, Symbol};
use crate::shard_store::ShardStore;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Mutex;

/// Ranking context passed to `search_symbols` (spec §4.5): which file is
/// currently focused and which files are open, used for scoring bonuses.
#[derive(Default, Clone)]
pub struct RankingContext {
    pub current_file: Option<String>,
    pub open_files: std::collections::HashSet<String>,
}

pub struct ScoredSymbol {
    pub symbol: Symbol,
    pub score: f64,
}

/// In-memory, unsaved-edit overlay: `didChange` writes here synchronously so
/// the very next handler invocation observes it (spec §5 read-your-writes).
#[derive(Default)]
pub struct Overlay {
    records: DashMap<String, FileRecord>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, record: FileRecord) {
        self.records.insert(record.uri.clone(), record);
    }

    pub fn clear(&self, uri: &str) {
        self.records.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<FileRecord> {
        self.records.get(uri).map(|r| r.value().clone())
    }

    pub fn all(&self) -> Vec<FileRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }
}

pub struct StaticIndex {
    records: HashMap<String, FileRecord>,
}

impl StaticIndex {
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let records: Vec<FileRecord> = serde_json::from_slice(&bytes)?;
        Ok(Self {
            records: records.into_iter().map(|r| (r.uri.clone(), r)).collect(),
        })
    }

    pub fn empty() -> Self {
        Self { records: HashMap::new() }
    }

    pub fn get(&self, uri: &str) -> Option<&FileRecord> {
        self.records.get(uri)
    }

    pub fn all(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }
}

pub struct MergedIndex {
    pub overlay: Overlay,
    pub shards: Mutex<InvertedIndices>,
    pub static_index: StaticIndex,
}

impl MergedIndex {
    pub fn new(static_index: StaticIndex) -> Self {
        Self {
            overlay: Overlay::new(),
            shards: Mutex::new(InvertedIndices::new()),
            static_index,
        }
    }

    /// `findDefinitions` — definitions for `name` across every tier,
    /// overlay entries first (they win on name collisions).
    pub fn find_definitions(&self, name: &str) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut seen_files = std::collections::HashSet::new();

        for record in self.overlay.all() {
            if record.uri_contains_definition(name) {
                seen_files.insert(record.uri.clone());
            }
            out.extend(record.symbols.iter().filter(|s| s.is_definition && s.name == name).cloned());
        }

        let shards = self.shards.lock().expect("shard index lock poisoned");
        for symbol in shards.definitions(name) {
            if seen_files.contains(&symbol.file_path) {
                continue;
            }
            out.push(symbol.clone());
        }
        drop(shards);

        for record in self.static_index.all() {
            if seen_files.contains(&record.uri) {
                continue;
            }
            out.extend(record.symbols.iter().filter(|s| s.is_definition && s.name == name).cloned());
        }

        out
    }

    /// `findReferencesByName` — union across all tiers.
    pub fn find_references_by_name(&self, name: &str) -> Vec<crate::model::Reference> {
        let mut out: Vec<crate::model::Reference> = Vec::new();
        for record in self.overlay.all() {
            out.extend(record.references.iter().filter(|r| r.symbol_name == name).cloned());
        }
        let shards = self.shards.lock().expect("shard index lock poisoned");
        out.extend(shards.references(name).iter().cloned());
        drop(shards);
        out.sort_by(|a, b| (a.location.file.as_str(), a.location.position.line, a.location.position.column)
            .cmp(&(b.location.file.as_str(), b.location.position.line, b.location.position.column)));
        out.dedup_by(|a, b| a.location.file == b.location.file && a.location.position == b.location.position);
        out
    }

    pub fn find_reference_candidates(&self, name: &str, basename: Option<&str>, limit: usize, store: &ShardStore) -> Vec<std::sync::Arc<FileRecord>> {
        store.find_reference_candidates(name, basename, limit)
    }

    /// `searchSymbols(q, limit, ctx)` (spec §4.5, §4.10.3): queries shorter
    /// than 3 characters use prefix matching only; longer queries get a
    /// BM25-like fulltext score. Hard cap applied by the caller (workspace
    /// symbol handler enforces 200).
    pub fn search_symbols(&self, query: &str, limit: usize, ctx: &RankingContext) -> Vec<ScoredSymbol> {
        let shards = self.shards.lock().expect("shard index lock poisoned");
        let prefix_mode = query.chars().count() < 3;
        let query_lower = query.to_lowercase();

        let mut scored: Vec<ScoredSymbol> = Vec::new();
        for name in shards.all_definition_names() {
            let name_lower = name.to_lowercase();
            let matches = if prefix_mode {
                name_lower.starts_with(&query_lower)
            } else {
                name_lower.contains(&query_lower)
            };
            if !matches {
                continue;
            }
            for symbol in shards.definitions(name) {
                let mut score = fts_score(&name_lower, &query_lower, prefix_mode);
                score += kind_bonus(symbol.kind);
                if ctx.current_file.as_deref() == Some(symbol.file_path.as_str()) {
                    score += 2.0;
                }
                if ctx.open_files.contains(&symbol.file_path) {
                    score += 1.0;
                }
                if name_lower == query_lower {
                    score += 3.0;
                }
                scored.push(ScoredSymbol { symbol: symbol.clone(), score });
            }
        }
        drop(shards);

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}

fn kind_bonus(kind: crate::model::SymbolKind) -> f64 {
    use crate::model::SymbolKind::*;
    match kind {
        Class | Function | Interface => 1.0,
        Variable | Constant => 0.0,
        _ => 0.5,
    }
}

fn fts_score(name_lower: &str, query_lower: &str, prefix_mode: bool) -> f64 {
    if prefix_mode {
        1.0 - (name_lower.len().saturating_sub(query_lower.len()) as f64 / 100.0)
    } else {
        // Crude BM25-like shape: reward shorter names containing the query
        // (denser term frequency) over long ones that merely contain it.
        let tf = 1.0;
        let len_norm = 1.0 / (1.0 + name_lower.len() as f64 / 20.0);
        tf * len_norm * 2.0
    }
}

impl FileRecord {
    fn uri_contains_definition(&self, name: &str) -> bool {
        self.symbols.iter().any(|s| s.is_definition && s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{content_hash, Location, Position, Range, SymbolKind};

    fn def(file: &str, name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            id: format!("{file}:{name}"),
            name: name.to_string(),
            kind,
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

    fn record(file: &str, name: &str, kind: SymbolKind) -> FileRecord {
        FileRecord {
            uri: file.to_string(),
            content_hash: content_hash(name),
            shard_version: crate::model::SHARD_VERSION,
            symbols: vec![def(file, name, kind)],
            references: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            pending_references: Vec::new(),
            is_skipped: false,
            skip_reason: None,
        }
    }

    #[test]
    fn overlay_takes_precedence_over_shards() {
        let idx = MergedIndex::new(StaticIndex::empty());
        idx.shards.lock().unwrap().apply_record("/a.ts", Some(record("/a.ts", "Widget", SymbolKind::Class)));
        idx.overlay.set(record("/a.ts", "Widget", SymbolKind::Class));
        let defs = idx.find_definitions("Widget");
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn search_symbols_ranks_class_above_variable() {
        let idx = MergedIndex::new(StaticIndex::empty());
        idx.shards.lock().unwrap().apply_record("/a.ts", Some(record("/a.ts", "widgetCount", SymbolKind::Variable)));
        idx.shards.lock().unwrap().apply_record("/b.ts", Some(record("/b.ts", "Widget", SymbolKind::Class)));
        let results = idx.search_symbols("widget", 10, &RankingContext::default());
        assert!(!results.is_empty());
        assert_eq!(results[0].symbol.kind, SymbolKind::Class);
    }
}
