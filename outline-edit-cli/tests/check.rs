use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
#[allow(deprecated)]
fn test_check_valid_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let doc = json!({"type": "doc", "content": [
        {"type": "paragraph", "content": [{"type": "text", "text": "ab"}]}
    ]});
    fs::write(&path, doc.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.arg("check").arg("--doc").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Valid: 4 positions"));
}

#[test]
#[allow(deprecated)]
fn test_check_rejects_grammar_violation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    // A paragraph cannot sit directly in a list.
    let doc = json!({"type": "doc", "content": [
        {"type": "bulletList", "content": [{"type": "paragraph"}]}
    ]});
    fs::write(&path, doc.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.arg("check").arg("--doc").arg(&path);

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Invalid"));
}

#[test]
#[allow(deprecated)]
fn test_check_malformed_json_exits_two() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    fs::write(&path, "{not json").unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.arg("check").arg("--doc").arg(&path);

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
#[allow(deprecated)]
fn test_check_with_custom_schema() {
    let dir = tempdir().unwrap();
    let schema_path = dir.path().join("schema.json");
    let schema = json!({
        "nodes": [
            {"name": "doc", "content": "heading paragraph*"},
            {"name": "heading", "content": "text*"},
            {"name": "paragraph", "content": "text*"},
            {"name": "text"}
        ]
    });
    fs::write(&schema_path, schema.to_string()).unwrap();
    let doc_path = dir.path().join("doc.json");
    let doc = json!({"type": "doc", "content": [{"type": "paragraph"}]});
    fs::write(&doc_path, doc.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.arg("check")
        .arg("--doc")
        .arg(&doc_path)
        .arg("--schema")
        .arg(&schema_path);

    cmd.assert().failure().code(1);
}

#[test]
#[allow(deprecated)]
fn test_resolve_prints_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let doc = json!({"type": "doc", "content": [
        {"type": "bulletList", "content": [
            {"type": "listItem", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "a"}]}
            ]}
        ]}
    ]});
    fs::write(&path, doc.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["resolve", "--pos", "3", "--doc"]).arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pos 3 depth 3 offset 0"))
        .stdout(predicate::str::contains("1 bulletList index 0 start 1 end 6"))
        .stdout(predicate::str::contains("3 paragraph index 0 start 3 end 4"));
}
