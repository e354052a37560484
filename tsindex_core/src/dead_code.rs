//! Dead-code analyzer (spec §4.10.6): finds exported definitions with no
//! referring file outside their own, using the reverse index for O(1)
//! lookups. Per-file mode is debounced by the caller (LSP adapter); this
//! module implements the scan itself plus the workspace-wide variant.

use crate::cancellation::{CancellationToken, Outcome};
use crate::indexer::Indexer;
use crate::model::{Symbol, SymbolKind};
use serde::Serialize;

/// Entry points are never reported dead even with zero referrers — they are
/// invoked by the runtime/test harness, not by other indexed source.
const ENTRY_POINT_PATTERNS: &[&str] = &["main", "index", ".test.", ".spec.", "__tests__"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadCodeCandidate {
    pub symbol_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDeadCodeReport {
    pub candidates: Vec<DeadCodeCandidate>,
    pub analyzed_files: usize,
    pub total_exports: usize,
    pub duration_ms: u64,
}

fn is_entry_point(file: &str) -> bool {
    let lower = file.to_lowercase();
    ENTRY_POINT_PATTERNS.iter().any(|p| lower.contains(p))
}

fn candidate_for(indexer: &Indexer, symbol: &Symbol) -> Option<DeadCodeCandidate> {
    if !symbol.is_exported || is_entry_point(&symbol.file_path) {
        return None;
    }
    let referrers = indexer.merged.shards.lock().expect("shard index lock poisoned").referring_files(symbol);
    if !referrers.is_empty() {
        return None;
    }
    // Overlay open-document references can still clear a symbol even before
    // the next save commits a shard; check those too.
    let overlay_hit = indexer.merged.overlay.all().iter().any(|r| {
        r.uri.to_lowercase() != symbol.file_path.to_lowercase()
            && r.references.iter().any(|rf| rf.symbol_name == symbol.name)
    });
    if overlay_hit {
        return None;
    }

    Some(DeadCodeCandidate {
        symbol_id: symbol.id.clone(),
        name: symbol.name.clone(),
        kind: symbol.kind,
        file: symbol.file_path.clone(),
        line: symbol.location.position.line,
        confidence: Confidence::High,
    })
}

/// Per-file check, called after the debounce window elapses (spec §4.10.6).
/// Returns `Outcome::Cancelled` if the token fires mid-file, which the
/// caller must treat as "no diagnostics published for that file" (spec §8).
pub fn analyze_file(indexer: &Indexer, uri: &str, token: &CancellationToken) -> Outcome<Vec<DeadCodeCandidate>> {
    let symbols: Vec<Symbol> = indexer.merged.shards.lock().expect("shard index lock poisoned").symbols_in_file(uri).to_vec();
    let mut out = Vec::new();
    for symbol in &symbols {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        if let Some(candidate) = candidate_for(indexer, symbol) {
            out.push(candidate);
        }
    }
    Outcome::Done(out)
}

/// Workspace-wide mode (spec §4.10.6): progress-reported, cancellable, scope
/// limited to files under `scope_prefix` when given.
pub fn analyze_workspace(
    indexer: &Indexer,
    scope_prefix: Option<&str>,
    token: &CancellationToken,
) -> Outcome<WorkspaceDeadCodeReport> {
    let start = std::time::Instant::now();
    let uris = indexer.shards.all_uris();
    let mut analyzed = 0usize;
    let mut total_exports = 0usize;
    let mut candidates = Vec::new();

    for uri in &uris {
        if let Some(prefix) = scope_prefix {
            if !uri.starts_with(prefix) {
                continue;
            }
        }
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        analyzed += 1;
        let symbols: Vec<Symbol> = indexer.merged.shards.lock().expect("shard index lock poisoned").symbols_in_file(uri).to_vec();
        for symbol in &symbols {
            if symbol.is_exported {
                total_exports += 1;
            }
            if let Some(candidate) = candidate_for(indexer, symbol) {
                candidates.push(candidate);
            }
        }
    }

    Outcome::Done(WorkspaceDeadCodeReport {
        candidates,
        analyzed_files: analyzed,
        total_exports,
        duration_ms: start.elapsed().as_millis() as u64,
    })
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
    fn unreferenced_export_is_reported_high_confidence() {
        let indexer = indexer_with(&[("/util.ts", "export function unusedHelper() {}")]);
        let token = CancellationToken::new();
        let report = analyze_workspace(&indexer, None, &token);
        let Outcome::Done(report) = report else { panic!("not cancelled") };
        assert!(report.candidates.iter().any(|c| c.name == "unusedHelper"));
    }

    #[test]
    fn adding_a_reference_clears_the_candidate() {
        let indexer = indexer_with(&[
            ("/util.ts", "export function unusedHelper() {}"),
            ("/app.ts", "import { unusedHelper } from \"./util\";\nunusedHelper();\n"),
        ]);
        let token = CancellationToken::new();
        let report = analyze_workspace(&indexer, None, &token);
        let Outcome::Done(report) = report else { panic!("not cancelled") };
        assert!(!report.candidates.iter().any(|c| c.name == "unusedHelper"));
    }

    #[test]
    fn entry_point_files_are_never_reported() {
        let indexer = indexer_with(&[("/src/index.ts", "export function bootstrap() {}")]);
        let token = CancellationToken::new();
        let report = analyze_workspace(&indexer, None, &token);
        let Outcome::Done(report) = report else { panic!("not cancelled") };
        assert!(report.candidates.is_empty());
    }
}
