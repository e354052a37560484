//! Find-References (spec §4.10.2): unions the name-indexed base set with a
//! scan of import rename tables across candidate files, plus a loose NgRx
//! mode for wildcard-imported action-creator usages.

use crate::indexer::Indexer;
use crate::model::{Import, Location, Position, Range};
use crate::position::symbol_at_cursor;
use serde::Serialize;

const CANDIDATE_LIMIT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    Exact,
    Import,
    NgrxMedium,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoundReference {
    pub location: Location,
    pub range: Range,
    pub confidence: Confidence,
}

/// `local_name` a file would use to refer to `target_name` given one of its
/// `import` declarations, if any (spec §4.10.2 "rename table").
fn local_alias_for(import: &Import, target_name: &str) -> Option<String> {
    if import.is_default || import.is_namespace {
        return None;
    }
    match &import.exported_name {
        Some(exported) if exported == target_name => Some(import.local_name.clone()),
        Some(_) => None,
        None if import.local_name == target_name => Some(import.local_name.clone()),
        None => None,
    }
}

fn basename_of(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".ts")
        .trim_end_matches(".tsx")
        .trim_end_matches(".js")
        .to_string()
}

pub fn find_references(
    indexer: &Indexer,
    file: &str,
    pos: Position,
    content: &str,
    include_declaration: bool,
) -> Vec<FoundReference> {
    let Some(symbol) = symbol_at_cursor(file, content, pos) else {
        return Vec::new();
    };
    let name = &symbol.name;

    let definitions = indexer.merged.find_definitions(name);
    let definition_basename = definitions.first().map(|d| basename_of(&d.file_path));

    let mut out: Vec<FoundReference> = Vec::new();

    for reference in indexer.merged.find_references_by_name(name) {
        out.push(FoundReference {
            location: reference.location,
            range: reference.range,
            confidence: Confidence::Exact,
        });
    }

    let candidates = indexer.shards.find_reference_candidates(name, definition_basename.as_deref(), CANDIDATE_LIMIT);
    for candidate in candidates {
        for import in &candidate.imports {
            if let Some(alias) = local_alias_for(import, name) {
                if alias == *name {
                    continue; // already covered by the exact name-based scan above
                }
                for reference in candidate.references.iter().filter(|r| r.symbol_name == alias) {
                    out.push(FoundReference {
                        location: reference.location.clone(),
                        range: reference.range,
                        confidence: Confidence::Import,
                    });
                }
            }
        }

        // NgRx-loose mode: a wildcard import of the definition's module,
        // with member accesses on it matching the target name, still counts
        // as a (lower-confidence) usage — e.g. `import * as fromActions` then
        // `fromActions.loadUsers`.
        let has_relevant_namespace_import = candidate.imports.iter().any(|i| i.is_namespace);
        if has_relevant_namespace_import {
            for pending in candidate.pending_references.iter().filter(|p| p.member == *name) {
                out.push(FoundReference {
                    location: pending.location.clone(),
                    range: pending.range,
                    confidence: Confidence::NgrxMedium,
                });
            }
        }
    }

    if include_declaration {
        for def in &definitions {
            out.push(FoundReference {
                location: def.location.clone(),
                range: def.range,
                confidence: Confidence::Exact,
            });
        }
    }

    out.sort_by(|a, b| {
        (a.location.file.as_str(), a.location.position.line, a.location.position.column)
            .cmp(&(b.location.file.as_str(), b.location.position.line, b.location.position.column))
    });
    out.dedup_by(|a, b| a.location.file == b.location.file && a.location.position == b.location.position);
    out
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
    fn finds_renamed_import_usage() {
        let indexer = indexer_with(&[
            ("/util.ts", "export function calculateTotal() {}\n"),
            (
                "/app.ts",
                "import { calculateTotal as calcTotal } from \"./util\";\ncalcTotal();\n",
            ),
        ]);
        let refs = find_references(&indexer, "/util.ts", Position::new(0, 18), "export function calculateTotal() {}\n", false);
        assert!(refs.iter().any(|r| r.location.file == "/app.ts" && r.confidence == Confidence::Import));
    }

    #[test]
    fn include_declaration_appends_definition_site() {
        let indexer = indexer_with(&[("/util.ts", "export function calculateTotal() {}\n")]);
        let refs = find_references(&indexer, "/util.ts", Position::new(0, 18), "export function calculateTotal() {}\n", true);
        assert!(refs.iter().any(|r| r.location.file == "/util.ts"));
    }
}
