//! AST Extractor (spec §4.2): the per-file analysis step the worker pool
//! runs for every changed file. Parses the file with oxc, walks it once with
//! [`visitor::JsVisitor`] to collect declarations/imports/exports/pending
//! member references, then runs a second `oxc_semantic` pass over the same
//! program to enumerate resolved identifier usages as [`Reference`]s —
//! mirroring the two-pass shape this crate's AST handling has always used.

mod frameworks;
mod visitor;

use crate::cancellation::CancellationToken;
use crate::line_index::LineIndex;
use crate::model::{FileRecord, Reference, SymbolKind, content_hash};
use oxc_allocator::Allocator;
use oxc_ast::AstKind;
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use std::collections::HashSet;
use std::path::Path;
use visitor::JsVisitor;

/// Extensions that parse as JSX-enabled TSX; everything else is plain TS.
fn is_jsx_extension(ext: &str) -> bool {
    matches!(ext, "tsx" | "jsx")
}

/// Maximum number of usage-site references recorded per file, mirroring the
/// worker pool's backpressure goals for pathologically large generated files.
const MAX_REFERENCES_PER_FILE: usize = 1500;

/// Parse and analyze one file's content, producing the shard-ready record.
/// `uri` is the file's canonical absolute path string used as the shard key.
pub fn analyze_file(uri: &str, content: &str, token: &CancellationToken) -> FileRecord {
    let hash = content_hash(content);
    let path = Path::new(uri);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(is_jsx_extension(ext));

    let ret = Parser::new(&allocator, content, source_type).parse();
    if !ret.errors.is_empty() {
        tracing::debug!(file = uri, errors = ret.errors.len(), "parser reported non-fatal errors");
    }

    if token.is_cancelled() {
        return FileRecord::skipped(uri.to_string(), hash, "cancelled");
    }

    let lines = LineIndex::new(content);
    let mut jsvisitor = JsVisitor::new(uri.to_string(), &lines);
    jsvisitor.visit_program(&ret.program);

    let exported_names = jsvisitor.exported_names.clone();
    let mut symbols = jsvisitor.symbols;
    for symbol in &mut symbols {
        if exported_names.contains(&symbol.name) {
            symbol.is_exported = true;
        }
    }

    let mut references = Vec::new();
    let semantic_ret = SemanticBuilder::new().build(&ret.program);
    if semantic_ret.errors.is_empty() {
        let semantic = semantic_ret.semantic;
        let mut seen: HashSet<(String, u32, u32)> = HashSet::new();

        'symbols: for symbol_id in semantic.scoping().symbol_ids() {
            if token.is_cancelled() {
                break;
            }
            let name = semantic.scoping().symbol_name(symbol_id);
            if name.is_empty() {
                continue;
            }

            let decl = semantic.symbol_declaration(symbol_id);
            let is_import = matches!(
                decl.kind(),
                AstKind::ImportSpecifier(_) | AstKind::ImportDefaultSpecifier(_) | AstKind::ImportNamespaceSpecifier(_)
            );

            for reference in semantic.symbol_references(symbol_id) {
                if references.len() >= MAX_REFERENCES_PER_FILE {
                    break 'symbols;
                }
                let span = semantic.reference_span(reference);
                let pos = lines.position_at(span.start);
                if !seen.insert((name.to_string(), pos.line, pos.column)) {
                    continue;
                }
                references.push(Reference {
                    symbol_name: name.to_string(),
                    location: crate::model::Location {
                        file: uri.to_string(),
                        position: pos,
                    },
                    range: crate::model::Range::new(pos, lines.position_at(span.end)),
                    container_name: None,
                    is_import,
                    scope_id: String::new(),
                    is_local: !exported_names.contains(name.as_str()),
                });
            }
        }
    } else {
        tracing::debug!(file = uri, "semantic analysis reported errors, skipping reference enumeration");
    }

    FileRecord {
        uri: uri.to_string(),
        content_hash: hash,
        shard_version: crate::model::SHARD_VERSION,
        symbols,
        references,
        imports: jsvisitor.imports,
        re_exports: jsvisitor.re_exports,
        pending_references: jsvisitor.pending_references,
        is_skipped: false,
        skip_reason: None,
    }
}

/// Classify a declaration `AstKind` the way the local-symbol pass does, kept
/// here for the dead-code analyzer which only needs the coarse kind.
pub fn ast_kind_symbol_kind(kind: &AstKind) -> Option<SymbolKind> {
    match kind {
        AstKind::Function(_) => Some(SymbolKind::Function),
        AstKind::Class(_) => Some(SymbolKind::Class),
        AstKind::VariableDeclarator(_) => Some(SymbolKind::Variable),
        AstKind::TSTypeAliasDeclaration(_) => Some(SymbolKind::Type),
        AstKind::TSInterfaceDeclaration(_) => Some(SymbolKind::Interface),
        AstKind::TSEnumDeclaration(_) => Some(SymbolKind::Enum),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;

    #[test]
    fn extracts_exported_function_and_class() {
        let token = CancellationToken::new();
        let record = analyze_file(
            "/proj/src/a.ts",
            "export function add(a: number, b: number) { return a + b; }\nexport class Widget {}\n",
            &token,
        );
        assert!(record.symbols.iter().any(|s| s.name == "add" && s.is_exported));
        assert!(record.symbols.iter().any(|s| s.name == "Widget" && s.is_exported));
    }

    #[test]
    fn records_import_specifiers() {
        let token = CancellationToken::new();
        let record = analyze_file(
            "/proj/src/b.ts",
            "import { Widget } from \"./a\";\nimport * as utils from \"./utils\";\n",
            &token,
        );
        assert_eq!(record.imports.len(), 2);
        assert!(record.imports.iter().any(|i| i.local_name == "Widget"));
        assert!(record.imports.iter().any(|i| i.is_namespace));
    }

    #[test]
    fn records_star_reexport() {
        let token = CancellationToken::new();
        let record = analyze_file("/proj/src/index.ts", "export * from \"./bar\";\n", &token);
        assert_eq!(record.re_exports.len(), 1);
        assert!(record.re_exports[0].is_all);
    }

    #[test]
    fn cancelled_token_short_circuits_to_skipped_record() {
        let token = CancellationToken::new();
        token.cancel();
        let record = analyze_file("/proj/src/c.ts", "export const a = 1;\n", &token);
        assert!(record.is_skipped);
    }

    #[test]
    fn object_literal_keys_become_nested_symbols() {
        let token = CancellationToken::new();
        let record = analyze_file(
            "/proj/src/config.ts",
            "export const Config = { someKey: 1, nested: { deepKey: 2 } };\n",
            &token,
        );
        let some_key = record.symbols.iter().find(|s| s.name == "someKey").unwrap();
        assert_eq!(some_key.container_name.as_deref(), Some("Config"));
        let deep_key = record.symbols.iter().find(|s| s.name == "deepKey").unwrap();
        assert_eq!(deep_key.full_container_path.as_deref(), Some("Config.nested"));
    }

    #[test]
    fn create_action_group_events_attach_to_their_binding() {
        let token = CancellationToken::new();
        let record = analyze_file(
            "/proj/src/user.actions.ts",
            "export const UserActions = createActionGroup({\n  source: 'User',\n  events: {\n    'Load Users': emptyProps(),\n  },\n});\n",
            &token,
        );
        let method = record.symbols.iter().find(|s| s.name == "loadUsers").unwrap();
        assert_eq!(method.container_name.as_deref(), Some("UserActions"));
    }
}
