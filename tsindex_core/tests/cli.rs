//! Black-box tests for the `tsindex` CLI binary against a fixture workspace.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tsindex() -> Command {
    Command::cargo_bin("tsindex").expect("tsindex binary built")
}

fn fixture_workspace() -> TempDir {
    let dir = TempDir::new().expect("create temp workspace");
    fs::write(
        dir.path().join("util.ts"),
        "export function calculateTotal(items: number[]): number {\n  return items.reduce((a, b) => a + b, 0);\n}\n\nexport function unusedHelper(): void {}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("app.ts"),
        "import { calculateTotal } from \"./util\";\n\nconsole.log(calculateTotal([1, 2, 3]));\n",
    )
    .unwrap();
    dir
}

#[test]
fn stats_reports_files_and_symbols() {
    let workspace = fixture_workspace();
    tsindex()
        .arg("--root")
        .arg(workspace.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("files"));
}

#[test]
fn stats_json_is_well_formed() {
    let workspace = fixture_workspace();
    let output = tsindex()
        .arg("--root")
        .arg(workspace.path())
        .arg("--json")
        .arg("stats")
        .output()
        .expect("run tsindex stats --json");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON stats output");
    assert!(parsed.get("files").is_some());
    assert!(parsed.get("symbols").is_some());
}

#[test]
fn find_dead_code_flags_the_unused_export() {
    let workspace = fixture_workspace();
    tsindex()
        .arg("--root")
        .arg(workspace.path())
        .arg("find-dead-code")
        .assert()
        .success()
        .stdout(predicate::str::contains("unusedHelper"));
}

#[test]
fn inspect_index_lists_definitions_for_a_file() {
    let workspace = fixture_workspace();
    tsindex()
        .arg("--root")
        .arg(workspace.path())
        .arg("inspect-index")
        .arg(workspace.path().join("util.ts").to_string_lossy().to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("calculateTotal"));
}

#[test]
fn clear_cache_succeeds_on_an_empty_workspace() {
    let workspace = TempDir::new().unwrap();
    tsindex()
        .arg("--root")
        .arg(workspace.path())
        .arg("clear-cache")
        .assert()
        .success();
}
