//! Integration tests for the Swift parser

use codeatlas_core::parser::ParserDispatcher;
use codeatlas_core::schema::EdgeType;
use codeatlas_core::{Language, ParsedFile, ParsedSymbol};

fn parse_swift(source: &str) -> ParsedFile {
    ParserDispatcher::new()
        .parse_source("App.swift", Language::Swift, source)
        .expect("failed to parse Swift source")
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
fn test_swift_class_struct_enum() {
    let source = r#"
class Engine {
    func start() {
    }
}

struct Point {
    var x: Int
    var y: Int
}

enum Direction {
    case up
    case down
}
"#;

    let file = parse_swift(source);
    let engine = find_symbol(&file, "Engine");
    assert_eq!(engine.kind, "class");
    assert!(engine
        .children
        .iter()
        .any(|c| c.name == "start" && c.kind == "method"));

    assert_eq!(find_symbol(&file, "Point").kind, "struct");
    assert_eq!(find_symbol(&file, "Direction").kind, "enum");
}

#[test]
fn test_swift_protocol_and_extension() {
    let source = r#"
protocol Drivable {
    func drive()
}

extension Engine {
    func stop() {
    }
}
"#;

    let file = parse_swift(source);
    assert_eq!(find_symbol(&file, "Drivable").kind, "protocol");
    assert_eq!(find_symbol(&file, "Engine").kind, "extension");
}

#[test]
fn test_swift_inheritance_edges() {
    let source = r#"
class Vehicle {
}

class Car: Vehicle, Drivable {
}
"#;

    let file = parse_swift(source);
    assert!(
        file.dependencies.iter().any(|d| {
            d.edge_type == EdgeType::Extends && d.source == "Car" && d.target == "Vehicle"
        }),
        "first supertype of a class is its base"
    );
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Implements && d.source == "Car" && d.target == "Drivable"
    }));
}

#[test]
fn test_swift_imports_are_external() {
    let source = r#"
import Foundation
import UIKit

func main() {
}
"#;

    let file = parse_swift(source);
    let imports: Vec<_> = file
        .dependencies
        .iter()
        .filter(|d| d.edge_type == EdgeType::Import)
        .collect();
    assert_eq!(imports.len(), 2);
    assert!(imports.iter().all(|d| d.is_external));
    assert!(imports.iter().any(|d| d.target_module == "Foundation"));
}

#[test]
fn test_swift_top_level_function_and_property() {
    let source = r#"
let limit = 10

func compute(x: Int) -> Int {
    return x + limit
}
"#;

    let file = parse_swift(source);
    assert_eq!(find_symbol(&file, "compute").kind, "function");
    assert_eq!(find_symbol(&file, "limit").kind, "variable");
}

#[test]
fn test_swift_calls() {
    let source = r#"
func helper() -> Int {
    return 1
}

func main() {
    let x = helper()
}
"#;

    let file = parse_swift(source);
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Call && d.source == "main" && d.target == "helper"
    }));
}

#[test]
fn test_swift_typealias() {
    let source = r#"
typealias Meters = Double
"#;

    let file = parse_swift(source);
    assert_eq!(find_symbol(&file, "Meters").kind, "typedef");
}
