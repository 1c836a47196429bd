//! Integration tests for the repository scanner

use codeatlas_core::{scan, Language, ScanFilter};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_scan_classifies_languages() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.go", b"package main\n");
    write_file(dir.path(), "lib.c", b"int x;\n");
    write_file(dir.path(), "lib.h", b"int x;\n");
    write_file(dir.path(), "app.ts", b"const x = 1;\n");
    write_file(dir.path(), "view.m", b"int x;\n");
    write_file(dir.path(), "README.md", b"# readme\n");

    let (files, issues) = scan(dir.path(), &ScanFilter::default()).unwrap();
    assert!(issues.is_empty());

    let langs: Vec<(&str, Language)> = files
        .iter()
        .map(|f| (f.path.as_str(), f.language))
        .collect();
    assert!(langs.contains(&("main.go", Language::Go)));
    assert!(langs.contains(&("lib.c", Language::C)));
    assert!(langs.contains(&("lib.h", Language::C)), ".h defaults to C");
    assert!(langs.contains(&("app.ts", Language::TypeScript)));
    assert!(langs.contains(&("view.m", Language::ObjC)));
    assert!(
        !langs.iter().any(|(p, _)| *p == "README.md"),
        "unknown extensions are skipped"
    );
}

#[test]
fn test_scan_paths_are_relative_with_forward_slashes() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/pkg/util.py", b"x = 1\n");

    let (files, _) = scan(dir.path(), &ScanFilter::default()).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "src/pkg/util.py");
    assert!(files[0].abs_path.is_absolute());
}

#[test]
fn test_scan_exclude_globs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/app.go", b"package app\n");
    write_file(dir.path(), "vendor/dep.go", b"package dep\n");
    write_file(dir.path(), "src/gen.go", b"package app\n");

    let filter = ScanFilter {
        exclude_globs: vec!["vendor/".to_string(), "**/gen.go".to_string()],
        ..ScanFilter::default()
    };
    let (files, _) = scan(dir.path(), &filter).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.go"]);
}

#[test]
fn test_scan_include_globs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.go", b"package a\n");
    write_file(dir.path(), "b.py", b"x = 1\n");
    write_file(dir.path(), "deep/c.go", b"package c\n");

    let filter = ScanFilter {
        include_globs: vec!["*.go".to_string()],
        ..ScanFilter::default()
    };
    let (files, _) = scan(dir.path(), &filter).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert!(paths.contains(&"a.go"));
    assert!(paths.contains(&"deep/c.go"), "globs match at any depth");
    assert!(!paths.contains(&"b.py"));
}

#[test]
fn test_scan_skips_binary_files() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "real.c", b"int x;\n");
    write_file(dir.path(), "fake.c", b"int x;\0\xff binary");

    let (files, _) = scan(dir.path(), &ScanFilter::default()).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["real.c"]);
}

#[test]
fn test_scan_binary_detection_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "fake.c", b"int x;\0");

    let filter = ScanFilter {
        binary_detection: false,
        ..ScanFilter::default()
    };
    let (files, _) = scan(dir.path(), &filter).unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_scan_size_cap() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "small.c", b"int x;\n");
    let big = vec![b'x'; 4096];
    write_file(dir.path(), "big.c", &big);

    let filter = ScanFilter {
        max_size_bytes: 1024,
        ..ScanFilter::default()
    };
    let (files, _) = scan(dir.path(), &filter).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["small.c"]);
}

#[test]
fn test_scan_is_deterministic() {
    let dir = TempDir::new().unwrap();
    for name in ["zeta.c", "alpha.c", "mid/beta.c", "mid/gamma.c"] {
        write_file(dir.path(), name, b"int x;\n");
    }

    let (first, _) = scan(dir.path(), &ScanFilter::default()).unwrap();
    let (second, _) = scan(dir.path(), &ScanFilter::default()).unwrap();
    assert_eq!(first, second, "walk order is stable across runs");
}

#[test]
fn test_scan_missing_root_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(scan(&missing, &ScanFilter::default()).is_err());
}

#[test]
fn test_scan_respects_gitignore() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), ".gitignore", b"generated.go\n");
    write_file(dir.path(), "kept.go", b"package a\n");
    write_file(dir.path(), "generated.go", b"package a\n");
    // A .git directory makes the ignore rules apply
    fs::create_dir_all(dir.path().join(".git")).unwrap();

    let (files, _) = scan(dir.path(), &ScanFilter::default()).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert!(paths.contains(&"kept.go"));
    assert!(!paths.contains(&"generated.go"));
}
