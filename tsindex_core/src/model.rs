//! Core data model: symbols, references, imports, re-exports and the
//! per-file shard record they are grouped into.
//!
//! See spec §3 ("DATA MODEL") for the authoritative shape; this module is a
//! direct, typed transcription of it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Current on-disk shard schema. Bump whenever a shard-affecting field
/// changes shape; shards written by an older version are treated as missing
/// (spec §3 invariant: "Shards older than the current SHARD_VERSION are
/// treated as missing").
pub const SHARD_VERSION: u32 = 1;

/// A zero-based (line, column) position in a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open source range, `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` falls within `[start, end)`, treated as a 2D span.
    pub fn contains(&self, pos: Position) -> bool {
        let after_start = (pos.line > self.start.line)
            || (pos.line == self.start.line && pos.column >= self.start.column);
        let before_end =
            (pos.line < self.end.line) || (pos.line == self.end.line && pos.column <= self.end.column);
        after_start && before_end
    }
}

/// A location within a specific file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub position: Position,
}

/// The kind of declaration a [`Symbol`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Class,
    Interface,
    Function,
    Method,
    Property,
    Variable,
    Constant,
    Type,
    Enum,
    EnumMember,
    Namespace,
    Module,
    Parameter,
    /// Text-indexed token from a non-TS/JS language (spec §6 `textIndexing`).
    Text,
}

impl SymbolKind {
    /// Priority used by strict-pipeline Rule 5 ("single winner"): lower is
    /// preferred. See spec §4.10.1 step 4, Rule 5.
    pub fn priority(self) -> u8 {
        match self {
            SymbolKind::Class => 0,
            SymbolKind::Function => 1,
            SymbolKind::Interface => 2,
            SymbolKind::Enum => 3,
            SymbolKind::Type => 4,
            SymbolKind::Variable => 5,
            SymbolKind::Constant => 6,
            SymbolKind::Method => 7,
            SymbolKind::Property => 8,
            SymbolKind::EnumMember => 9,
            SymbolKind::Namespace => 10,
            SymbolKind::Module => 11,
            SymbolKind::Parameter => 12,
            SymbolKind::Text => 13,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enumMember",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Module => "module",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Text => "text",
        }
    }
}

/// Free-form per-framework metadata bag (spec §3 `metadata`, §4.1 "Framework
/// metadata"). Keyed by namespace (`"angular"`, `"ngrx"`, ...).
pub type Metadata = HashMap<String, serde_json::Value>;

/// A declaration site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable 16-hex-digit fingerprint, see [`symbol_id`].
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub range: Range,
    pub container_name: Option<String>,
    pub container_kind: Option<SymbolKind>,
    pub full_container_path: Option<String>,
    pub is_static: Option<bool>,
    pub parameters_count: Option<usize>,
    pub is_definition: bool,
    pub is_exported: bool,
    pub metadata: Metadata,
    pub file_path: String,
}

/// Fingerprint a symbol from its identity-bearing fields. Stable across
/// re-indexes of unchanged content (spec §3 invariant).
pub fn symbol_id(
    file: &str,
    container_path: &str,
    name: &str,
    kind: SymbolKind,
    is_static: bool,
    param_count: usize,
    start_line: u32,
    start_col: u32,
) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    file.hash(&mut hasher);
    container_path.hash(&mut hasher);
    name.hash(&mut hasher);
    kind.as_str().hash(&mut hasher);
    is_static.hash(&mut hasher);
    param_count.hash(&mut hasher);
    start_line.hash(&mut hasher);
    start_col.hash(&mut hasher);
    let digest = hasher.finish();

    let mut out = String::with_capacity(16);
    let _ = write!(out, "{:016x}", digest);
    out
}

/// An identifier use site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reference {
    pub symbol_name: String,
    pub location: Location,
    pub range: Range,
    pub container_name: Option<String>,
    /// Use is an import binding.
    pub is_import: bool,
    /// Dotted scope path from enclosing declarations.
    pub scope_id: String,
    /// Bound to a local variable in the current scope; must be excluded
    /// from cross-file searches unless explicitly requested.
    pub is_local: bool,
}

/// A member access `X.y` where `X` is an imported binding, deferred for
/// cross-file resolution once the target file's exports are known.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingReference {
    pub container: String,
    pub member: String,
    pub location: Location,
    pub range: Range,
}

/// One binding introduced by an `import` declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Import {
    pub local_name: String,
    pub module_specifier: String,
    pub is_default: bool,
    pub is_namespace: bool,
    /// Present iff the import was renamed: `import { A as B }` yields
    /// `exported_name = Some("A")`, `local_name = "B"`.
    pub exported_name: Option<String>,
    pub location: Location,
}

/// A re-export declaration (`export * from "m"` or `export { n } from "m"`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReExport {
    pub module_specifier: String,
    pub is_all: bool,
    pub exported_names: Option<Vec<String>>,
}

/// One file's cached extraction result — the unit the shard store persists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    pub uri: String,
    pub content_hash: String,
    pub shard_version: u32,
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub imports: Vec<Import>,
    pub re_exports: Vec<ReExport>,
    pub pending_references: Vec<PendingReference>,
    pub is_skipped: bool,
    pub skip_reason: Option<String>,
}

impl FileRecord {
    pub fn skipped(uri: String, content_hash: String, reason: impl Into<String>) -> Self {
        Self {
            uri,
            content_hash,
            shard_version: SHARD_VERSION,
            symbols: Vec::new(),
            references: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            pending_references: Vec::new(),
            is_skipped: true,
            skip_reason: Some(reason.into()),
        }
    }

    /// True if this record was written under an older shard schema and
    /// must be treated as missing (spec §3 invariant).
    pub fn is_stale(&self) -> bool {
        self.shard_version != SHARD_VERSION
    }
}

pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_stable_for_identical_input() {
        let a = symbol_id("a.ts", "", "foo", SymbolKind::Function, false, 0, 1, 7);
        let b = symbol_id("a.ts", "", "foo", SymbolKind::Function, false, 0, 1, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn symbol_id_changes_with_position() {
        let a = symbol_id("a.ts", "", "foo", SymbolKind::Function, false, 0, 1, 7);
        let b = symbol_id("a.ts", "", "foo", SymbolKind::Function, false, 0, 2, 7);
        assert_ne!(a, b);
    }

    #[test]
    fn range_contains_is_inclusive_on_both_ends() {
        let r = Range::new(Position::new(1, 2), Position::new(1, 10));
        assert!(r.contains(Position::new(1, 2)));
        assert!(r.contains(Position::new(1, 10)));
        assert!(r.contains(Position::new(1, 5)));
        assert!(!r.contains(Position::new(1, 1)));
        assert!(!r.contains(Position::new(1, 11)));
    }

    #[test]
    fn kind_priority_orders_class_before_variable() {
        assert!(SymbolKind::Class.priority() < SymbolKind::Variable.priority());
        assert!(SymbolKind::Function.priority() < SymbolKind::Interface.priority());
    }
}
