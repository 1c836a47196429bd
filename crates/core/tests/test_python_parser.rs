//! Integration tests for the Python parser

use codeatlas_core::schema::EdgeType;
use codeatlas_core::{Language, ParsedFile, ParsedSymbol, ParserDispatcher};

fn parse_py(source: &str) -> ParsedFile {
    ParserDispatcher::new()
        .parse_source("app.py", Language::Python, source)
        .expect("failed to parse Python source")
}

fn find_symbol<'a>(file: &'a ParsedFile, name: &str) -> &'a ParsedSymbol {
    fn walk<'a>(symbols: &'a [ParsedSymbol], name: &str) -> Option<&'a ParsedSymbol> {
        for s in symbols {
            if s.name == name {
                return Some(s);
            }
            if let Some(found) = walk(&s.children, name) {
                return Some(found);
            }
        }
        None
    }
    walk(&file.symbols, name).unwrap_or_else(|| panic!("symbol {name} not found"))
}

#[test]
fn test_python_functions_and_classes() {
    let source = r#"
def top():
    pass

class Greeter:
    def greet(self):
        pass

    @property
    def name(self):
        return "g"
"#;

    let file = parse_py(source);
    assert_eq!(find_symbol(&file, "top").kind, "function");

    let greeter = find_symbol(&file, "Greeter");
    assert_eq!(greeter.kind, "class");
    let methods: Vec<&str> = greeter.children.iter().map(|c| c.name.as_str()).collect();
    assert!(methods.contains(&"greet"));
    assert!(methods.contains(&"name"), "decorated methods are extracted");
    assert!(greeter.children.iter().all(|c| c.kind == "method"));
}

#[test]
fn test_python_decorated_function() {
    let source = r#"
@lru_cache
def cached(x):
    return x
"#;

    let file = parse_py(source);
    assert_eq!(find_symbol(&file, "cached").kind, "function");
}

#[test]
fn test_python_module_variable() {
    let source = r#"
VERSION = "1.0"
"#;

    let file = parse_py(source);
    assert_eq!(find_symbol(&file, "VERSION").kind, "variable");
}

#[test]
fn test_python_import_classification() {
    let source = r#"
import os
import requests
from .sibling import thing
from ..parent import other
from typing import List
"#;

    let file = parse_py(source);
    let imports: Vec<_> = file
        .dependencies
        .iter()
        .filter(|d| d.edge_type == EdgeType::Import)
        .collect();

    let os_import = imports.iter().find(|d| d.target_module == "os").unwrap();
    assert!(os_import.is_stdlib);

    let requests = imports
        .iter()
        .find(|d| d.target_module == "requests")
        .unwrap();
    assert!(requests.is_external);

    let sibling = imports
        .iter()
        .find(|d| d.target_module == ".sibling")
        .unwrap();
    assert!(!sibling.is_external, "relative imports are local");
    assert!(!sibling.is_stdlib);

    assert!(imports.iter().any(|d| d.target_module == "..parent"));

    let typing = imports.iter().find(|d| d.target_module == "typing").unwrap();
    assert!(typing.is_stdlib);
}

#[test]
fn test_python_calls() {
    let source = r#"
def helper():
    return 1

def main():
    x = helper()
    obj.refresh()
"#;

    let file = parse_py(source);
    let calls: Vec<_> = file
        .dependencies
        .iter()
        .filter(|d| d.edge_type == EdgeType::Call)
        .collect();
    assert!(calls
        .iter()
        .any(|c| c.source == "main" && c.target == "helper"));
    assert!(
        calls
            .iter()
            .any(|c| c.source == "main" && c.target == "refresh"),
        "attribute calls record the rightmost name"
    );
}

#[test]
fn test_python_body_docstring() {
    let source = r#"
def documented():
    """Returns a constant.

    Nothing else."""
    return 1
"#;

    let file = parse_py(source);
    let doc = &find_symbol(&file, "documented").docstring;
    assert!(doc.starts_with("Returns a constant."), "got: {doc}");
}

#[test]
fn test_python_preceding_comment_docstring() {
    let source = r#"
# Legacy entry point.
def run():
    pass
"#;

    let file = parse_py(source);
    assert_eq!(find_symbol(&file, "run").docstring, "Legacy entry point.");
}

#[test]
fn test_python_extends_edge() {
    let source = r#"
class Base:
    pass

class Child(Base):
    pass
"#;

    let file = parse_py(source);
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Extends && d.source == "Child" && d.target == "Base"
    }));
}

#[test]
fn test_python_signature() {
    let source = r#"
def add(a: int, b: int) -> int:
    return a + b
"#;

    let file = parse_py(source);
    assert_eq!(
        find_symbol(&file, "add").signature,
        "def add(a: int, b: int) -> int"
    );
}
