//! Hover (spec §4.10.4): resolves the symbol at the cursor, picks the best
//! definition (same file, then by kind priority), and renders a short
//! Markdown block.

use crate::indexer::Indexer;
use crate::model::{Position, Symbol};
use crate::position::symbol_at_cursor;
use std::fmt::Write as _;

pub fn hover(indexer: &Indexer, file: &str, pos: Position, content: &str) -> Option<String> {
    let symbol = symbol_at_cursor(file, content, pos)?;
    let candidates = indexer.merged.find_definitions(&symbol.name);
    if candidates.is_empty() {
        return None;
    }

    let best = pick_best(&candidates, file)?;
    Some(render(best))
}

fn pick_best<'a>(candidates: &'a [Symbol], request_file: &str) -> Option<&'a Symbol> {
    candidates
        .iter()
        .min_by_key(|s| (s.file_path != request_file, s.kind.priority()))
}

fn render(symbol: &Symbol) -> String {
    let mut out = String::new();
    let mut signature = symbol.kind.as_str().to_string();
    if symbol.is_static == Some(true) {
        signature = format!("static {signature}");
    }
    if let Some(container) = &symbol.container_name {
        let _ = write!(out, "**{container}.{name}**", name = symbol.name);
    } else {
        let _ = write!(out, "**{}**", symbol.name);
    }
    let _ = write!(out, "  \n`{signature}`");
    if let Some(params) = symbol.parameters_count {
        let _ = write!(out, "({params} params)");
    }

    for (namespace, value) in &symbol.metadata {
        let _ = write!(out, "\n\n_{namespace}_: `{value}`");
    }

    let _ = write!(out, "\n\n{}:{}", symbol.file_path, symbol.location.position.line + 1);
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
    fn renders_kind_and_location_for_a_function() {
        let indexer = indexer_with(&[("/util.ts", "export function calculateTotal() {}\n")]);
        let content = "export function calculateTotal() {}\n";
        let col = content.find("calculateTotal").unwrap() as u32;
        let text = hover(&indexer, "/util.ts", Position::new(0, col), content).unwrap();
        assert!(text.contains("function"));
        assert!(text.contains("/util.ts:1"));
    }

    #[test]
    fn returns_none_for_unknown_symbol() {
        let indexer = indexer_with(&[]);
        let result = hover(&indexer, "/a.ts", Position::new(0, 0), "doesNotExist();\n");
        assert!(result.is_none());
    }
}
