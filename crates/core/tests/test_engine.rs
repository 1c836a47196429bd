//! Integration tests for the CST engine facade

use codeatlas_core::engine;
use codeatlas_core::schema::IssueKind;
use codeatlas_core::Language;

#[test]
fn test_parse_returns_tree() {
    let tree = engine::parse_source("int main(void) { return 0; }", Language::C).unwrap();
    assert_eq!(tree.root_node().kind(), "translation_unit");
    assert!(engine::advisory_issue(&tree, "ok.c").is_none());
}

#[test]
fn test_advisory_issue_on_syntax_error() {
    let tree = engine::parse_source("int broken( {", Language::C).unwrap();
    let issue = engine::advisory_issue(&tree, "bad.c").expect("expected an advisory issue");
    assert_eq!(issue.kind, IssueKind::Parse);
    assert_eq!(issue.file, "bad.c");
    assert!(issue.line.is_some(), "issue should carry a location");
}

#[test]
fn test_partial_tree_is_usable_after_error() {
    let source = "int broken( {\n\nint ok(void) { return 1; }\n";
    let tree = engine::parse_source(source, Language::C).unwrap();
    assert!(tree.root_node().has_error());
    // The valid function is still reachable in the tree
    let text = engine::node_text(&tree.root_node(), source);
    assert!(text.contains("ok"));
}

#[test]
fn test_query_matches_with_named_captures() {
    let source = "package main\n\nfunc alpha() {}\n\nfunc beta() {}\n";
    let tree = engine::parse_source(source, Language::Go).unwrap();

    let matches = engine::query_matches(
        tree.root_node(),
        "(function_declaration name: (identifier) @fn_name)",
        Language::Go,
        source,
    )
    .unwrap();

    let names: Vec<String> = matches
        .iter()
        .flat_map(|m| m.iter())
        .filter(|c| c.name == "fn_name")
        .map(|c| engine::node_text(&c.node, source).to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn test_query_capture_indices_follow_pattern_order() {
    let source = "package main\n\nfunc alpha() {}\n";
    let tree = engine::parse_source(source, Language::Go).unwrap();

    let matches = engine::query_matches(
        tree.root_node(),
        "(function_declaration name: (identifier) @name) @decl",
        Language::Go,
        source,
    )
    .unwrap();

    for m in &matches {
        for capture in m {
            match capture.name.as_str() {
                "name" => assert_eq!(capture.index, 0),
                "decl" => assert_eq!(capture.index, 1),
                other => panic!("unexpected capture {other}"),
            }
        }
    }
}

#[test]
fn test_invalid_query_is_an_error() {
    let tree = engine::parse_source("package main\n", Language::Go).unwrap();
    let result = engine::query_matches(tree.root_node(), "(nonsense_node) @x", Language::Go, "");
    assert!(result.is_err());
}

#[test]
fn test_every_language_has_a_grammar() {
    for language in [
        Language::Go,
        Language::C,
        Language::Cpp,
        Language::ObjC,
        Language::Java,
        Language::Kotlin,
        Language::Swift,
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
    ] {
        assert!(
            engine::parse_source("", language).is_ok(),
            "no grammar for {language}"
        );
    }
}
