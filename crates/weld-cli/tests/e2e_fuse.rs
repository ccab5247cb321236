//! E2E CLI tests: fuse and check over real fragment files.
//!
//! Each test runs the `weld` binary as a subprocess against fragments
//! written into an isolated temp directory.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the weld binary, rooted in `dir`.
fn weld_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("weld"));
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr.
    cmd.env("WELD_LOG", "error");
    cmd
}

const REQ_FRAGMENT: &str = r#"{
    "model": {"id": "model-req", "name": "FanSystem"},
    "elements": [
        {"id": "pkg-req", "type": "Package", "name": "Requirements"},
        {"id": "req-auth", "type": "Requirement", "name": "用户认证",
         "description": "系统提供登录功能", "parentId": "pkg-req"}
    ]
}"#;

const BDD_FRAGMENT: &str = r#"{
    "model": {"id": "model-bdd", "name": "FanSystem"},
    "elements": [
        {"id": "pkg-bdd", "type": "Package", "name": "Structure"},
        {"id": "blk-ctl", "type": "Block", "name": "Controller", "parentId": "pkg-bdd"},
        {"id": "req-auth-2", "type": "Requirement", "name": "用户认证",
         "description": "用户登录和注册", "parentId": "pkg-bdd"},
        {"id": "sat-1", "type": "Satisfy",
         "blockId": "blk-ctl", "requirementId": "req-auth"}
    ]
}"#;

const BROKEN_FRAGMENT: &str = r#"{
    "model": {"id": "model-x", "name": "X"},
    "elements": [
        {"id": "req-1", "type": "Requirement", "name": "R", "parentId": "pkg-missing"}
    ]
}"#;

fn write_fragments(dir: &Path) {
    std::fs::write(dir.join("req.json"), REQ_FRAGMENT).expect("write req.json");
    std::fs::write(dir.join("bdd.json"), BDD_FRAGMENT).expect("write bdd.json");
}

// ---------------------------------------------------------------------------
// fuse
// ---------------------------------------------------------------------------

#[test]
fn fuse_writes_both_documents() {
    let tmp = TempDir::new().expect("tempdir");
    write_fragments(tmp.path());

    weld_cmd(tmp.path())
        .args([
            "fuse",
            "req.json",
            "bdd.json",
            "--out-json",
            "fused.json",
            "--out-xmi",
            "model.xmi",
            "--no-metadata",
        ])
        .assert()
        .success();

    let fused: Value = serde_json::from_str(
        &std::fs::read_to_string(tmp.path().join("fused.json")).expect("read fused.json"),
    )
    .expect("fused.json parses");

    // The duplicated requirement merged; provenance is recorded.
    let elements = fused["elements"].as_array().expect("elements");
    let req = elements
        .iter()
        .find(|e| e["id"] == "req-auth")
        .expect("canonical requirement");
    let sources = req["sourceIds"].as_array().expect("sourceIds");
    assert_eq!(sources.len(), 2);
    assert!(
        !elements.iter().any(|e| e["id"] == "req-auth-2"),
        "absorbed element must not be emitted"
    );
    assert_eq!(fused["statistics"]["merged_away"], 2, "model roots + requirement");

    let xmi = std::fs::read_to_string(tmp.path().join("model.xmi")).expect("read model.xmi");
    assert!(xmi.contains("uml:Model"));
    assert!(xmi.contains("sysml:Requirement"));
    assert!(xmi.contains("base_Abstraction=\"sat-1\""));
    assert!(!xmi.contains("xmi:Documentation"), "--no-metadata");
}

#[test]
fn fuse_prints_json_to_stdout_without_output_paths() {
    let tmp = TempDir::new().expect("tempdir");
    write_fragments(tmp.path());

    let output = weld_cmd(tmp.path())
        .args(["fuse", "req.json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    // Stdout carries the document followed by a one-line summary; the
    // document spans the first '{' to the last '}'.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let start = stdout.find('{').expect("json on stdout");
    let end = stdout.rfind('}').expect("closing brace");
    let doc: Value = serde_json::from_str(&stdout[start..=end]).expect("fused document");
    assert_eq!(doc["model"]["id"], "model-req");
}

#[test]
fn fuse_rejects_bad_threshold_before_reading_files() {
    let tmp = TempDir::new().expect("tempdir");
    // No fragment files on disk: the config error must come first.
    weld_cmd(tmp.path())
        .args(["fuse", "missing.json", "--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("threshold"));
}

#[test]
fn fuse_reports_every_bad_fragment() {
    let tmp = TempDir::new().expect("tempdir");
    write_fragments(tmp.path());
    std::fs::write(tmp.path().join("broken.json"), BROKEN_FRAGMENT).expect("write");
    std::fs::write(tmp.path().join("trunc.json"), "{\"model\":").expect("write");

    weld_cmd(tmp.path())
        .args(["fuse", "req.json", "broken.json", "trunc.json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("broken.json"))
        .stderr(predicates::str::contains("pkg-missing"))
        .stderr(predicates::str::contains("trunc.json"))
        .stderr(predicates::str::contains("2 of 3 fragments rejected"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_passes_valid_fragments() {
    let tmp = TempDir::new().expect("tempdir");
    write_fragments(tmp.path());

    weld_cmd(tmp.path())
        .args(["check", "req.json", "bdd.json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("all 2 fragments valid"));
}

#[test]
fn check_keys_prints_canonical_path_keys() {
    let tmp = TempDir::new().expect("tempdir");
    write_fragments(tmp.path());

    weld_cmd(tmp.path())
        .args(["check", "--keys", "req.json"])
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Requirement::FanSystem.Requirements.用户认证",
        ));
}

#[test]
fn check_reports_integrity_error_with_code() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("broken.json"), BROKEN_FRAGMENT).expect("write");

    weld_cmd(tmp.path())
        .args(["check", "broken.json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E3002"))
        .stderr(predicates::str::contains("pkg-missing"));
}
