//! Go-to-Definition (spec §4.10.1): cache lookup, member-chain resolution,
//! position resolution, strict filtering pipeline, and (bounded) semantic
//! disambiguation.

use crate::cache::HandlerCache;
use crate::indexer::Indexer;
use crate::model::{Position, Symbol, SymbolKind};
use crate::position::{parse_member_access, symbol_at_cursor};
use std::time::Duration;

/// Bound for the semantic-disambiguation race (spec §4.10.1 step 5). No
/// external TypeScript language service is wired into this crate, so the
/// race currently has nothing to race against; kept here so the constant is
/// ready when that step is implemented.
#[allow(dead_code)]
const DISAMBIGUATION_TIMEOUT: Duration = Duration::from_millis(500);
const MEMBER_CHAIN_MAX_DEPTH: usize = 10;

/// Keywords the fallback word-at-offset search refuses to chase — jumping
/// to "the" definition of `if` or `return` is never useful.
const FALLBACK_BLOCKLIST: &[&str] = &[
    "if", "else", "for", "while", "return", "const", "let", "var", "function", "class", "import",
    "export", "default", "async", "await", "new", "this", "super", "interface", "type", "enum",
];

type CacheKey = (String, u32, u32);

pub struct DefinitionHandler {
    cache: HandlerCache<CacheKey, Vec<Symbol>>,
}

impl DefinitionHandler {
    pub fn new() -> Self {
        Self {
            cache: HandlerCache::default(),
        }
    }

    pub fn invalidate_file(&mut self, file: &str) {
        self.cache.invalidate_file(file);
    }

    pub fn goto_definition(&mut self, indexer: &Indexer, file: &str, pos: Position, content: &str) -> Vec<Symbol> {
        let key = (file.to_string(), pos.line, pos.column);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let result = self.resolve(indexer, file, pos, content);
        self.cache.put(file, key, result.clone());
        result
    }

    fn resolve(&self, indexer: &Indexer, file: &str, pos: Position, content: &str) -> Vec<Symbol> {
        if let Some(access) = parse_member_access(file, content, pos) {
            if let Some(result) = self.resolve_member_chain(indexer, file, &access) {
                return result;
            }
        }

        let Some(symbol) = symbol_at_cursor(file, content, pos) else {
            return self.fallback_word_search(indexer, file, pos, content);
        };

        if !symbol.is_definition {
            // Cursor is on a reference/import binding: resolve through
            // imports first (spec §4.10.1 step 3).
            if let Some(resolved) = self.resolve_via_import(indexer, file, &symbol.name) {
                return resolved;
            }
        }

        let candidates = indexer.merged.find_definitions(&symbol.name);
        self.apply_strict_pipeline(candidates, file, pos)
    }

    fn resolve_via_import(&self, indexer: &Indexer, file: &str, name: &str) -> Option<Vec<Symbol>> {
        let imports = indexer.merged.shards.lock().expect("shard index lock poisoned").imports_in_file(file).to_vec();
        let import = imports.iter().find(|i| i.local_name == name)?;
        let target = indexer.resolver().resolve(&import.module_specifier, std::path::Path::new(file))?;
        let target_uri = target.to_string_lossy().to_string();
        let lookup_name = import.exported_name.clone().unwrap_or_else(|| name.to_string());

        let direct: Vec<Symbol> = indexer
            .merged
            .shards
            .lock()
            .expect("shard index lock poisoned")
            .symbols_in_file(&target_uri)
            .iter()
            .filter(|s| s.is_definition && s.name == lookup_name)
            .cloned()
            .collect();
        if !direct.is_empty() {
            return Some(direct);
        }

        // Fall through re-exports (spec scenario 4).
        let resolved = indexer.resolver().resolve_reexport(&lookup_name, &import.module_specifier, std::path::Path::new(file), &|p| {
            indexer.shards.get(&p.to_string_lossy()).map(|r| (*r).clone())
        })?;
        let resolved_uri = resolved.to_string_lossy().to_string();
        Some(
            indexer
                .merged
                .shards
                .lock()
                .expect("shard index lock poisoned")
                .symbols_in_file(&resolved_uri)
                .iter()
                .filter(|s| s.is_definition && s.name == lookup_name)
                .cloned()
                .collect(),
        )
    }

    /// Walks a `parseMemberAccess` chain: resolve the base identifier via
    /// `findDefinitions`, then follow each property into the base's
    /// object-literal/synthesized-members shape (spec §4.10.1 step 2).
    fn resolve_member_chain(&self, indexer: &Indexer, file: &str, access: &crate::position::MemberAccess) -> Option<Vec<Symbol>> {
        let base_candidates = indexer.merged.find_definitions(&access.base_name);
        let mut current = self.apply_strict_pipeline(base_candidates, file, Position::new(0, 0));
        if current.is_empty() {
            return None;
        }

        for (depth, property) in access.property_chain.iter().enumerate() {
            if depth >= MEMBER_CHAIN_MAX_DEPTH {
                break;
            }
            let next: Vec<Symbol> = current
                .iter()
                .flat_map(|container| {
                    indexer
                        .merged
                        .shards
                        .lock()
                        .expect("shard index lock poisoned")
                        .symbols_in_file(&container.file_path)
                        .iter()
                        .filter(|s| {
                            s.container_name.as_deref() == Some(container.name.as_str()) && s.name == *property
                        })
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .collect();
            if next.is_empty() {
                return Some(current);
            }
            current = next;
        }
        Some(current)
    }

    fn fallback_word_search(&self, indexer: &Indexer, file: &str, pos: Position, content: &str) -> Vec<Symbol> {
        let Some(word) = word_at_offset(content, pos) else {
            return Vec::new();
        };
        if FALLBACK_BLOCKLIST.contains(&word.as_str()) {
            return Vec::new();
        }
        let candidates = indexer.merged.find_definitions(&word);
        self.apply_strict_pipeline(candidates, file, pos)
    }

    /// The five-rule strict filtering pipeline (spec §4.10.1 step 4). Pure
    /// and idempotent: running it twice on its own output is a no-op
    /// (spec §8).
    fn apply_strict_pipeline(&self, mut candidates: Vec<Symbol>, request_file: &str, cursor: Position) -> Vec<Symbol> {
        // Rule 1: self-reference.
        candidates.retain(|s| !(s.file_path == request_file && s.range.contains(cursor)));

        // Rule 2: code superiority — drop text-kind results if any real
        // definition exists.
        if candidates.iter().any(|s| s.is_definition && s.kind != SymbolKind::Text) {
            candidates.retain(|s| s.kind != SymbolKind::Text);
        }

        // Rule 3: implementation over abstraction — prefer class over
        // interface for the same name.
        let has_class = candidates.iter().any(|s| s.kind == SymbolKind::Class);
        if has_class {
            candidates.retain(|s| s.kind != SymbolKind::Interface);
        }

        // Rule 4: import ban — this crate never emits import-specifier
        // kind symbols as definitions, so this is a defensive no-op, kept
        // to mirror the pipeline's five named rules.
        candidates.retain(|s| s.is_definition);

        // Rule 5: single winner — keep one per file (earliest start line),
        // then if several files remain with identical names, pick the
        // highest-priority kind.
        candidates.sort_by_key(|s| (s.file_path.clone(), s.location.position.line));
        let mut by_file: Vec<Symbol> = Vec::new();
        for symbol in candidates {
            if !by_file.iter().any(|s: &Symbol| s.file_path == symbol.file_path) {
                by_file.push(symbol);
            }
        }

        if by_file.len() > 1 {
            let all_same_name = by_file.windows(2).all(|w| w[0].name == w[1].name);
            if all_same_name {
                by_file.sort_by_key(|s| s.kind.priority());
                by_file.truncate(1);
            }
        }

        by_file
    }
}

impl Default for DefinitionHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn word_at_offset(content: &str, pos: Position) -> Option<String> {
    let line = content.lines().nth(pos.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let col = (pos.column as usize).min(chars.len());
    let is_word = |c: &char| c.is_alphanumeric() || *c == '_' || *c == '$';

    let mut start = col;
    while start > 0 && is_word(&chars[start - 1]) {
        start -= 1;
    }
    let mut end = col;
    while end < chars.len() && is_word(&chars[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some(chars[start..end].iter().collect())
}
