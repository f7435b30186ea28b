//! CLI integration tests using assert_cmd
//!
//! Tests the full CLI binary with real command-line arguments.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_version() {
    Command::cargo_bin("closurize")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("closurize")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("closurize"))
        .stdout(predicate::str::contains("--untyped"))
        .stdout(predicate::str::contains("--externs"));
}

#[test]
fn test_cli_missing_path_fails() {
    Command::cargo_bin("closurize")
        .unwrap()
        .assert()
        .failure();
}

// ============================================================================
// File Processing Tests
// ============================================================================

#[test]
fn test_cli_annotates_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("widget.ts");
    fs::write(
        &file_path,
        "class Widget { constructor(public id: number) {} }",
    )
    .unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(&file_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget.prototype.id;"))
        .stdout(predicate::str::contains("@type {number}"))
        .stdout(predicate::str::contains("this.id = id;"))
        .stdout(predicate::str::contains(": number").not());
}

#[test]
fn test_cli_untyped_mode() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("x.ts");
    fs::write(&file_path, "let count: number = 1;").unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(&file_path)
        .arg("--untyped")
        .assert()
        .success()
        .stdout(predicate::str::contains("@type {?}"))
        .stdout(predicate::str::contains("@type {number}").not());
}

#[test]
fn test_cli_output_directory() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("mod.ts");
    fs::write(&file_path, "export const version: string = '1';").unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(&file_path)
        .arg("-o")
        .arg(out_dir.path())
        .assert()
        .success();

    let written = fs::read_to_string(out_dir.path().join("mod.js")).unwrap();
    assert!(written.contains("@type {string}"), "{written}");
    assert!(!written.contains(": string"), "{written}");
}

#[test]
fn test_cli_externs_from_declaration_file() {
    let temp_dir = TempDir::new().unwrap();
    let dts = temp_dir.path().join("api.d.ts");
    fs::write(
        &dts,
        "declare namespace api { function ping(host: string): boolean; }",
    )
    .unwrap();
    let externs_path = temp_dir.path().join("externs.js");

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(&dts)
        .arg("--externs")
        .arg(&externs_path)
        .assert()
        .success();

    let externs = fs::read_to_string(&externs_path).unwrap();
    assert!(externs.starts_with("/** @externs */"), "{externs}");
    assert!(externs.contains("var api = {};"), "{externs}");
    assert!(
        externs.contains("api.ping = function(host) {};"),
        "{externs}"
    );
}

#[test]
fn test_cli_directory_walk() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.ts"), "const a: number = 1;").unwrap();
    fs::write(temp_dir.path().join("b.ts"), "const b: string = 'x';").unwrap();
    fs::write(temp_dir.path().join("notes.md"), "# not source").unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("const a = 1;"))
        .stdout(predicate::str::contains("const b = 'x';"))
        .stdout(predicate::str::contains("not source").not());
}

#[test]
fn test_cli_cross_file_imports() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("dep.ts"), "export class Dep {}").unwrap();
    fs::write(
        temp_dir.path().join("app.ts"),
        "import {Dep} from './dep';\nlet d: Dep;",
    )
    .unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("goog.forwardDeclare"))
        .stdout(predicate::str::contains("tsickle_forward_declare_1.Dep"));
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_cli_error_diagnostic_sets_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("ns.ts");
    fs::write(&file_path, "namespace oops { const x = 1; }").unwrap();

    Command::cargo_bin("closurize")
        .unwrap()
        .arg(&file_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("namespaces are not supported"));
}

#[test]
fn test_cli_json_diagnostics() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("ns.ts");
    fs::write(&file_path, "namespace oops {}").unwrap();

    let output = Command::cargo_bin("closurize")
        .unwrap()
        .arg(&file_path)
        .arg("--json")
        .output()
        .unwrap();

    let stderr = String::from_utf8(output.stderr).unwrap();
    let first_line = stderr.lines().next().expect("expected a JSON diagnostic");
    let parsed: serde_json::Value = serde_json::from_str(first_line).unwrap();
    assert_eq!(parsed["category"], "error");
    assert_eq!(parsed["line"], 1);
    assert!(parsed["message"]
        .as_str()
        .unwrap()
        .contains("namespaces are not supported"));
}
