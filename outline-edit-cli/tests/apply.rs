use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn para(text: &str) -> serde_json::Value {
    json!({"type": "paragraph", "content": [{"type": "text", "text": text}]})
}

fn item(text: &str) -> serde_json::Value {
    json!({"type": "listItem", "content": [para(text)]})
}

fn write_doc(dir: &Path, doc: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("doc.json");
    fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
    path
}

#[test]
#[allow(deprecated)]
fn test_sink_prints_nested_document() {
    let dir = tempdir().unwrap();
    let doc = json!({"type": "doc", "content": [
        {"type": "bulletList", "content": [item("a"), item("b")]}
    ]});
    let path = write_doc(dir.path(), &doc);

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "sink", "--anchor", "8", "--doc"]).arg(&path);

    cmd.assert().success().stdout(predicate::str::contains(
        r#"doc(bulletList(listItem(paragraph("a"), bulletList(listItem(paragraph("b"))))))"#,
    ));
}

#[test]
#[allow(deprecated)]
fn test_wrap_json_output() {
    let dir = tempdir().unwrap();
    let doc = json!({"type": "doc", "content": [para("a"), para("b")]});
    let path = write_doc(dir.path(), &doc);

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "wrap", "--anchor", "1", "--head", "5", "--json", "--doc"])
        .arg(&path);

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = json.get("steps").unwrap().as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].get("stepType").unwrap(), "replaceAround");
    assert_eq!(steps[1].get("stepType").unwrap(), "split");
    assert_eq!(
        json.get("selection").unwrap(),
        &json!({"type": "text", "anchor": 3, "head": 9})
    );
    let list = &json["doc"]["content"][0];
    assert_eq!(list["type"], "bulletList");
    assert_eq!(list["content"].as_array().unwrap().len(), 2);
}

#[test]
#[allow(deprecated)]
fn test_inapplicable_command_exits_one() {
    let dir = tempdir().unwrap();
    let doc = json!({"type": "doc", "content": [para("a")]});
    let path = write_doc(dir.path(), &doc);

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "lift", "--anchor", "1", "--doc"]).arg(&path);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not applicable"));
}

#[test]
#[allow(deprecated)]
fn test_start_list_converts_marker() {
    let dir = tempdir().unwrap();
    let doc = json!({"type": "doc", "content": [para("- a")]});
    let path = write_doc(dir.path(), &doc);

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "start-list", "--anchor", "3", "--doc"])
        .arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            r#"doc(bulletList(listItem(paragraph("a"))))"#,
        ))
        .stdout(predicate::str::contains("selection: 3 3"));
}

#[test]
#[allow(deprecated)]
fn test_missing_document_exits_two() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "split", "--anchor", "1", "--doc"])
        .arg(dir.path().join("missing.json"));

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
#[allow(deprecated)]
fn test_selection_outside_document_exits_two() {
    let dir = tempdir().unwrap();
    let doc = json!({"type": "doc", "content": [para("a")]});
    let path = write_doc(dir.path(), &doc);

    let mut cmd = Command::cargo_bin("outline-edit").unwrap();
    cmd.args(["apply", "split", "--anchor", "40", "--doc"])
        .arg(&path);

    cmd.assert().failure().code(2);
}
