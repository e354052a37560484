//! Exercises the handler pipeline end-to-end against small multi-file
//! workspaces, one test per canonical scenario.

use tsindex::cancellation::CancellationToken;
use tsindex::config::IndexerConfig;
use tsindex::extractor::analyze_file;
use tsindex::handlers::{self, DefinitionHandler};
use tsindex::{Indexer, Pos, SymbolKind};

fn workspace(files: &[(&str, &str)]) -> Indexer {
    let dir = tempfile::tempdir().unwrap();
    let indexer = Indexer::new(dir.path().to_path_buf(), IndexerConfig::default());
    let token = CancellationToken::new();
    for (path, content) in files {
        let record = analyze_file(path, content, &token);
        indexer.merged.shards.lock().unwrap().apply_record(path, Some(record.clone()));
        indexer.shards.put(record);
    }
    indexer
}

#[test]
fn jump_to_imported_function_resolves_to_its_declaration() {
    let indexer = workspace(&[
        ("/util.ts", "export function calculateTotal() { return 0; }\n"),
        ("/app.ts", "import { calculateTotal } from \"./util\";\ncalculateTotal();\n"),
    ]);
    let mut handler = DefinitionHandler::new();
    let content = "import { calculateTotal } from \"./util\";\ncalculateTotal();\n";
    let col = content.lines().nth(1).unwrap().find("calculateTotal").unwrap() as u32;
    let result = handler.goto_definition(&indexer, "/app.ts", Pos::new(1, col), content);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].file_path, "/util.ts");
    assert!(result[0].is_definition);
}

#[test]
fn renamed_import_is_found_by_find_references() {
    let indexer = workspace(&[
        ("/util.ts", "export function calculateTotal() { return 0; }\n"),
        (
            "/app.ts",
            "import { calculateTotal as total } from \"./util\";\ntotal();\ntotal();\n",
        ),
    ]);
    let def_content = "export function calculateTotal() { return 0; }\n";
    let col = def_content.find("calculateTotal").unwrap() as u32;
    let refs = handlers::find_references(&indexer, "/util.ts", Pos::new(0, col), def_content, false);
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|r| r.location.file == "/app.ts"));
}

#[test]
fn re_export_chain_resolves_through_the_barrel_file() {
    let indexer = workspace(&[
        ("/impl.ts", "export function calculateTotal() { return 0; }\n"),
        ("/index.ts", "export { calculateTotal } from \"./impl\";\n"),
        (
            "/app.ts",
            "import { calculateTotal } from \"./index\";\ncalculateTotal();\n",
        ),
    ]);
    let mut handler = DefinitionHandler::new();
    let content = "import { calculateTotal } from \"./index\";\ncalculateTotal();\n";
    let col = content.lines().nth(1).unwrap().find("calculateTotal").unwrap() as u32;
    let result = handler.goto_definition(&indexer, "/app.ts", Pos::new(1, col), content);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].file_path, "/impl.ts");
}

#[test]
fn class_definition_wins_over_same_named_interface() {
    let indexer = workspace(&[
        ("/model-class.ts", "export class Order {}\n"),
        ("/model-iface.ts", "export interface Order {}\n"),
    ]);
    let mut handler = DefinitionHandler::new();
    let result = handler.goto_definition(&indexer, "/use.ts", Pos::new(0, 0), "new Order();\n");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].kind, SymbolKind::Class);
}

#[test]
fn self_reference_on_own_declaration_returns_nothing() {
    let indexer = workspace(&[("/a.ts", "export function widget() {}\n")]);
    let mut handler = DefinitionHandler::new();
    let content = "export function widget() {}\n";
    let col = content.find("widget").unwrap() as u32;
    let result = handler.goto_definition(&indexer, "/a.ts", Pos::new(0, col), content);
    assert!(result.is_empty());
}

#[test]
fn dead_code_scan_flags_an_unreferenced_export_but_not_an_entry_point() {
    let indexer = workspace(&[
        ("/util.ts", "export function unusedHelper() {}\nexport function calculateTotal() { return 0; }\n"),
        ("/app.ts", "import { calculateTotal } from \"./util\";\ncalculateTotal();\n"),
        ("/main.ts", "export function bootstrap() {}\n"),
    ]);
    let token = CancellationToken::new();
    let report = match tsindex::dead_code::analyze_workspace(&indexer, None, &token) {
        tsindex::cancellation::Outcome::Done(r) => r,
        tsindex::cancellation::Outcome::Cancelled => panic!("scan should not be cancelled"),
    };
    let names: Vec<&str> = report.candidates.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"unusedHelper"));
    assert!(!names.contains(&"calculateTotal"));
    assert!(!names.contains(&"bootstrap"));
}

#[test]
fn workspace_symbol_search_is_capped_and_skips_empty_queries() {
    let files: Vec<(String, String)> = (0..10)
        .map(|i| (format!("/file{i}.ts"), format!("export function widget{i}() {{}}\n")))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let indexer = workspace(&refs);
    let ctx = indexer.ranking_context(None);

    assert!(handlers::workspace_symbol(&indexer, "", &ctx).is_empty());
    let results = handlers::workspace_symbol(&indexer, "widget", &ctx);
    assert_eq!(results.len(), 10);
}
