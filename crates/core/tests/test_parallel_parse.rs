//! Integration tests for the parser pool

use codeatlas_core::pool::ParserPool;
use codeatlas_core::scanner::ScannedFile;
use codeatlas_core::schema::IssueKind;
use codeatlas_core::Language;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

fn scanned(root: &Path, rel: &str, language: Language) -> ScannedFile {
    ScannedFile {
        path: rel.to_string(),
        abs_path: root.join(rel),
        language,
    }
}

fn write_file(root: &Path, rel: &str, content: &str) {
    fs::write(root.join(rel), content).unwrap();
}

#[test]
fn test_pool_parses_all_files() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..20 {
        let name = format!("f{i}.py");
        write_file(dir.path(), &name, &format!("def fn_{i}():\n    pass\n"));
        files.push(scanned(dir.path(), &name, Language::Python));
    }

    let pool = ParserPool::new(4);
    let (parsed, issues) = pool.process(files, None).unwrap();
    assert!(issues.is_empty());
    assert_eq!(parsed.len(), 20);
}

#[test]
fn test_pool_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "good.py", "x = 1\n");

    let files = vec![
        scanned(dir.path(), "good.py", Language::Python),
        scanned(dir.path(), "missing.py", Language::Python),
    ];

    let pool = ParserPool::new(2);
    let (parsed, issues) = pool.process(files, None).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::Filesystem);
    assert_eq!(issues[0].file, "missing.py");
}

#[test]
fn test_pool_results_cover_input_regardless_of_order() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..32 {
        let name = format!("m{i}.go");
        write_file(
            dir.path(),
            &name,
            &format!("package p{i}\n\nfunc F{i}() {{}}\n"),
        );
        files.push(scanned(dir.path(), &name, Language::Go));
    }

    let pool = ParserPool::new(8);
    let (parsed, _) = pool.process(files, None).unwrap();

    let mut paths: Vec<String> = parsed.iter().map(|f| f.path.clone()).collect();
    paths.sort();
    let mut expected: Vec<String> = (0..32).map(|i| format!("m{i}.go")).collect();
    expected.sort();
    assert_eq!(paths, expected, "every file is parsed exactly once");
}

#[test]
fn test_pool_single_worker() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.py", "x = 1\n");
    write_file(dir.path(), "b.py", "y = 2\n");

    let files = vec![
        scanned(dir.path(), "a.py", Language::Python),
        scanned(dir.path(), "b.py", Language::Python),
    ];

    let pool = ParserPool::new(1);
    let (parsed, _) = pool.process(files, None).unwrap();
    assert_eq!(parsed.len(), 2);
}

#[test]
fn test_pool_zero_workers_clamped() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.py", "x = 1\n");

    let pool = ParserPool::new(0);
    let files = vec![scanned(dir.path(), "a.py", Language::Python)];
    let (parsed, _) = pool.process(files, None).unwrap();
    assert_eq!(parsed.len(), 1);
}

#[test]
fn test_pool_cancellation_skips_pending_work() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..8 {
        let name = format!("f{i}.py");
        write_file(dir.path(), &name, "x = 1\n");
        files.push(scanned(dir.path(), &name, Language::Python));
    }

    let cancel = AtomicBool::new(true);
    let pool = ParserPool::new(2);
    let (parsed, issues) = pool.process(files, Some(&cancel)).unwrap();
    assert!(parsed.is_empty(), "pre-cancelled pool parses nothing");
    assert!(issues.is_empty());
}

#[test]
fn test_pool_parse_errors_are_advisory_not_fatal() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "bad.c", "int broken( {\n");
    write_file(dir.path(), "good.c", "int fine(void) { return 0; }\n");

    let files = vec![
        scanned(dir.path(), "bad.c", Language::C),
        scanned(dir.path(), "good.c", Language::C),
    ];

    let pool = ParserPool::new(2);
    let (parsed, issues) = pool.process(files, None).unwrap();
    // Both files produce results; the syntax error lives in the file's own
    // error list rather than the pool's hard-failure list.
    assert_eq!(parsed.len(), 2);
    assert!(issues.is_empty());
    let bad = parsed.iter().find(|f| f.path == "bad.c").unwrap();
    assert!(!bad.errors.is_empty());
}
