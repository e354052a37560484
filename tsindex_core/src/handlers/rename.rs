//! Rename (spec §4.10.5): `prepareRename` validates the cursor sits on a
//! renameable (non-external) symbol and returns its word range; `rename`
//! generates bottom-up text edits for the definition and every reference so
//! earlier edits never invalidate later offsets within the same file.

use crate::indexer::Indexer;
use crate::model::{Position, Range};
use crate::position::symbol_at_cursor;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct PrepareRenameResult {
    pub range: Range,
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

fn is_external(file: &str) -> bool {
    file.contains("node_modules")
}

pub fn prepare_rename(indexer: &Indexer, file: &str, pos: Position, content: &str) -> Option<PrepareRenameResult> {
    let symbol = symbol_at_cursor(file, content, pos)?;
    let definitions = indexer.merged.find_definitions(&symbol.name);
    if definitions.iter().any(|d| is_external(&d.file_path)) {
        return None;
    }
    if definitions.is_empty() && is_external(file) {
        return None;
    }

    Some(PrepareRenameResult {
        range: symbol.range,
        placeholder: symbol.name,
    })
}

/// Returns a map of file path to its text edits, each file's edits sorted
/// bottom-up (descending by start position) so applying them in order never
/// shifts a not-yet-applied edit's offsets.
pub fn apply_rename(
    indexer: &Indexer,
    file: &str,
    pos: Position,
    content: &str,
    new_name: &str,
) -> HashMap<String, Vec<TextEdit>> {
    let mut edits: HashMap<String, Vec<TextEdit>> = HashMap::new();

    let Some(symbol) = symbol_at_cursor(file, content, pos) else {
        return edits;
    };

    for def in indexer.merged.find_definitions(&symbol.name) {
        edits.entry(def.file_path.clone()).or_default().push(TextEdit {
            range: name_range(def.range, &def.name),
            new_text: new_name.to_string(),
        });
    }

    for reference in super::references::find_references(indexer, file, pos, content, false) {
        edits.entry(reference.location.file.clone()).or_default().push(TextEdit {
            range: reference.range,
            new_text: new_name.to_string(),
        });
    }

    for file_edits in edits.values_mut() {
        file_edits.sort_by(|a, b| b.range.start.line.cmp(&a.range.start.line).then(b.range.start.column.cmp(&a.range.start.column)));
        file_edits.dedup_by(|a, b| a.range.start == b.range.start);
    }
    edits
}

/// A symbol's stored range spans its whole declaration; the rename edit only
/// needs the trailing `name.len()` columns of the first line, since every
/// extractor-emitted span starts at the `export`/keyword token rather than
/// the identifier itself for container declarations. For definitions synced
/// from `symbol_at_cursor` (leaf declarations) the range already is the name.
fn name_range(range: Range, name: &str) -> Range {
    let mut end = range.end;
    if range.start.line == range.end.line {
        end.column = range.start.column + name.chars().count() as u32;
    }
    Range::new(range.start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::config::IndexerConfig;

    fn indexer_with(files: &[(&str, &str)]) -> Indexer {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::new(dir.path().to_path_buf(), IndexerConfig::default());
        let token = CancellationToken::new();
        for (uri, content) in files {
            let record = crate::extractor::analyze_file(uri, content, &token);
            indexer.merged.shards.lock().unwrap().apply_record(uri, Some(record.clone()));
            indexer.shards.put(record);
        }
        indexer
    }

    #[test]
    fn prepare_rename_rejects_external_symbols() {
        let indexer = indexer_with(&[("/node_modules/pkg/index.ts", "export function lib() {}\n")]);
        let content = "lib();\n";
        let result = prepare_rename(&indexer, "/node_modules/pkg/index.ts", Position::new(0, 18), "export function lib() {}\n");
        assert!(result.is_none());
        let _ = content;
    }

    #[test]
    fn apply_rename_produces_edits_for_definition_and_reference() {
        let indexer = indexer_with(&[
            ("/util.ts", "export function calculateTotal() {}\n"),
            ("/app.ts", "import { calculateTotal } from \"./util\";\ncalculateTotal();\n"),
        ]);
        let content = "export function calculateTotal() {}\n";
        let col = content.find("calculateTotal").unwrap() as u32;
        let edits = apply_rename(&indexer, "/util.ts", Position::new(0, col), content, "computeTotal");
        assert!(edits.contains_key("/util.ts"));
    }
}
