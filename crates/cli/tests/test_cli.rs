//! Integration tests for the codeatlas binary

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn codeatlas() -> Command {
    Command::new(env!("CARGO_BIN_EXE_codeatlas"))
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_writes_artifact_to_file() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "main.go",
        "package main\n\nfunc main() {\n\thelper()\n}\n\nfunc helper() {\n}\n",
    );
    let artifact_path = dir.path().join("atlas.json");

    let status = codeatlas()
        .arg(dir.path())
        .arg("--output")
        .arg(&artifact_path)
        .arg("--quiet")
        .status()
        .unwrap();
    assert!(status.success());

    let artifact: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&artifact_path).unwrap()).unwrap();
    assert_eq!(artifact["metadata"]["version"], "1.0.0");
    assert_eq!(artifact["metadata"]["total_files"], 1);
    assert_eq!(artifact["metadata"]["failure_count"], 0);

    let files = artifact["files"].as_array().unwrap();
    assert!(files.iter().any(|f| f["path"] == "main.go"));
    assert!(artifact["relationships"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["edge_type"] == "call"));
}

#[test]
fn test_stdout_artifact_and_stderr_summary() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    pass\n");

    let output = codeatlas().arg(dir.path()).output().unwrap();
    assert!(output.status.success());

    let artifact: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(artifact["metadata"]["success_count"], 1);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 files"), "summary goes to stderr: {stderr}");
}

#[test]
fn test_quiet_suppresses_summary() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "x = 1\n");

    let output = codeatlas().arg(dir.path()).arg("--quiet").output().unwrap();
    assert!(output.status.success());
    assert!(output.stderr.is_empty(), "no summary with --quiet");
}

#[test]
fn test_exclude_flag() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/app.py", "x = 1\n");
    write_file(dir.path(), "vendor/lib.py", "y = 2\n");

    let output = codeatlas()
        .arg(dir.path())
        .arg("--exclude")
        .arg("vendor/")
        .arg("--quiet")
        .output()
        .unwrap();
    assert!(output.status.success());

    let artifact: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let paths: Vec<&str> = artifact["files"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["path"].as_str())
        .collect();
    assert!(paths.contains(&"src/app.py"));
    assert!(!paths.contains(&"vendor/lib.py"));
}

#[test]
fn test_pretty_streaming_output_is_valid_json() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.py", "x = 1\n");
    write_file(dir.path(), "b.py", "y = 2\n");
    let artifact_path = dir.path().join("atlas.json");

    let status = codeatlas()
        .arg(dir.path())
        .arg("--pretty")
        .arg("--streaming")
        .arg("--output")
        .arg(&artifact_path)
        .arg("--quiet")
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&artifact_path).unwrap();
    assert!(text.contains('\n'), "pretty output is indented");
    let artifact: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(artifact["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_root_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent");

    let output = codeatlas().arg(&missing).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "got: {stderr}");
}
