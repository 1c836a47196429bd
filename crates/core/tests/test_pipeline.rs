//! End-to-end pipeline scenarios

use chrono::{TimeZone, Utc};
use codeatlas_core::pipeline::{parse_repository, parse_repository_with_cancel, AtlasError};
use codeatlas_core::schema::{EdgeType, IssueKind, ParseOutput, SymbolKind};
use codeatlas_core::{AtlasOptions, ScanFilter};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn fixed_options() -> AtlasOptions {
    AtlasOptions {
        filter: ScanFilter::default(),
        worker_count: 2,
        project_package: None,
        timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
    }
}

fn parse(root: &Path) -> ParseOutput {
    parse_repository(root, &fixed_options()).unwrap()
}

#[test]
fn test_single_go_file_call_edge() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "main.go",
        "package main\n\nfunc main() {\n\thelper()\n}\n\nfunc helper() {\n}\n",
    );

    let output = parse(dir.path());
    assert_eq!(output.metadata.total_files, 1);
    assert_eq!(output.metadata.success_count, 1);

    let file = output.files.iter().find(|f| f.path == "main.go").unwrap();
    let main_sym = file
        .symbols
        .iter()
        .find(|s| s.name == "main" && s.kind == SymbolKind::Function)
        .expect("main symbol");
    let helper_sym = file
        .symbols
        .iter()
        .find(|s| s.name == "helper" && s.kind == SymbolKind::Function)
        .expect("helper symbol");

    let call = output
        .relationships
        .iter()
        .find(|e| e.edge_type == EdgeType::Call)
        .expect("call edge");
    assert_eq!(call.source_id, main_sym.symbol_id);
    assert_eq!(call.target_id, helper_sym.symbol_id);
}

#[test]
fn test_c_header_impl_pair() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "math.h", "int add(int a, int b);\n");
    write_file(
        dir.path(),
        "math.c",
        "#include \"math.h\"\n\nint add(int a, int b) {\n    return a + b;\n}\n",
    );

    let output = parse(dir.path());
    assert_eq!(output.files.len(), 2);

    let header = output.files.iter().find(|f| f.path == "math.h").unwrap();
    let impl_file = output.files.iter().find(|f| f.path == "math.c").unwrap();

    let header_add = header.symbols.iter().find(|s| s.name == "add").unwrap();
    let impl_add = impl_file.symbols.iter().find(|s| s.name == "add").unwrap();

    let decl_edge = output
        .relationships
        .iter()
        .find(|e| e.edge_type == EdgeType::ImplementsDeclaration)
        .expect("implements_declaration edge");
    assert_eq!(decl_edge.source_id, impl_add.symbol_id);
    assert_eq!(decl_edge.target_id, header_add.symbol_id);

    let header_edge = output
        .relationships
        .iter()
        .find(|e| e.edge_type == EdgeType::ImplementsHeader)
        .expect("implements_header edge");
    assert_eq!(header_edge.source_file, "math.c");
    assert_eq!(header_edge.target_file, "math.h");
    assert_eq!(header_edge.source_id, impl_file.symbols[0].symbol_id);
    assert_eq!(header_edge.target_id, header.symbols[0].symbol_id);
}

#[test]
fn test_javascript_external_import() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.js", "import _ from 'lodash';\n");

    let output = parse(dir.path());

    let external = output
        .files
        .iter()
        .find(|f| f.path == "__external__")
        .expect("external pseudo-file");
    let lodash = external
        .symbols
        .iter()
        .find(|s| s.name == "lodash" && s.kind == SymbolKind::Module)
        .expect("lodash module symbol");

    let app = output.files.iter().find(|f| f.path == "app.js").unwrap();
    let import = output
        .relationships
        .iter()
        .find(|e| e.edge_type == EdgeType::Import)
        .unwrap();
    assert_eq!(import.source_id, app.symbols[0].symbol_id);
    assert_eq!(import.target_id, lodash.symbol_id);
    assert_eq!(import.target_module, "lodash");
}

#[test]
fn test_python_relative_import() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "pkg/a.py", "from .b import foo\n");
    write_file(dir.path(), "pkg/b.py", "def foo():\n    pass\n");

    let output = parse(dir.path());

    let b_file = output.files.iter().find(|f| f.path == "pkg/b.py").unwrap();
    let import = output
        .relationships
        .iter()
        .find(|e| e.edge_type == EdgeType::Import)
        .unwrap();
    assert_eq!(import.target_file, "pkg/b.py");
    assert_eq!(import.target_id, b_file.symbols[0].symbol_id);
}

#[test]
fn test_malformed_c_file_partial_success() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "broken.c",
        r#"
int broken(int x) {
    int y = x +
}

int alpha(void) { return 1; }
int beta(void) { return 2; }
int gamma(void) { return 3; }
"#,
    );

    let output = parse(dir.path());
    assert_eq!(output.metadata.success_count, 1, "file is kept");
    assert!(output
        .metadata
        .errors
        .iter()
        .any(|e| e.kind == IssueKind::Parse && e.file == "broken.c"));

    let file = output.files.iter().find(|f| f.path == "broken.c").unwrap();
    for name in ["alpha", "beta", "gamma"] {
        assert!(
            file.symbols.iter().any(|s| s.name == name),
            "expected {name} to survive the syntax error"
        );
    }
}

#[test]
fn test_identical_trees_identical_artifacts() {
    let make_repo = || {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "main.go", "package main\n\nfunc main() {}\n");
        write_file(dir.path(), "pkg/a.py", "from .b import foo\n");
        write_file(dir.path(), "pkg/b.py", "def foo():\n    pass\n");
        write_file(dir.path(), "app.js", "import _ from 'lodash';\n");
        dir
    };

    let first_dir = make_repo();
    let second_dir = make_repo();

    let first = serde_json::to_string(&parse(first_dir.path())).unwrap();
    let second = serde_json::to_string(&parse(second_dir.path())).unwrap();
    assert_eq!(first, second, "identical trees serialize byte-identically");
}

#[test]
fn test_repeat_parse_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.c", "int a(void);\n");
    write_file(dir.path(), "b.c", "int b(void);\n");
    write_file(dir.path(), "c.py", "import os\n");

    let first = serde_json::to_string(&parse(dir.path())).unwrap();
    let second = serde_json::to_string(&parse(dir.path())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent");
    let err = parse_repository(&missing, &fixed_options()).unwrap_err();
    assert!(matches!(err, AtlasError::RootNotFound(_)));
}

#[test]
fn test_cancellation_aborts() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.py", "x = 1\n");

    let cancel = AtomicBool::new(false);
    cancel.store(true, Ordering::Relaxed);
    let err = parse_repository_with_cancel(dir.path(), &fixed_options(), Some(&cancel))
        .unwrap_err();
    assert!(matches!(err, AtlasError::Cancelled));
}

#[test]
fn test_metadata_counts_are_consistent() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "ok.py", "x = 1\n");
    write_file(dir.path(), "other.py", "y = 2\n");

    let output = parse(dir.path());
    assert_eq!(
        output.metadata.total_files,
        output.metadata.success_count + output.metadata.failure_count
    );
}

#[test]
fn test_exclude_filter_respected_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/app.py", "x = 1\n");
    write_file(dir.path(), "vendor/lib.py", "y = 2\n");

    let mut options = fixed_options();
    options.filter.exclude_globs = vec!["vendor/".to_string()];
    let output = parse_repository(dir.path(), &options).unwrap();

    assert!(output.files.iter().any(|f| f.path == "src/app.py"));
    assert!(!output.files.iter().any(|f| f.path == "vendor/lib.py"));
}

#[test]
fn test_header_language_promoted_in_artifact() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "widget.h", "int widget_count(void);\n");
    write_file(
        dir.path(),
        "widget.cpp",
        "int widget_count(void) { return 3; }\n",
    );

    let output = parse(dir.path());
    let header = output.files.iter().find(|f| f.path == "widget.h").unwrap();
    assert_eq!(header.language, "cpp");
}
