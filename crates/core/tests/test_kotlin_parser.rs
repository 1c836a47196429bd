//! Integration tests for the Kotlin parser

use codeatlas_core::parser::ParserDispatcher;
use codeatlas_core::schema::EdgeType;
use codeatlas_core::{Language, ParsedFile, ParsedSymbol};

fn parse_kt(source: &str) -> ParsedFile {
    ParserDispatcher::new()
        .parse_source("App.kt", Language::Kotlin, source)
        .expect("failed to parse Kotlin source")
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
fn test_kotlin_class_and_members() {
    let source = r#"
class Account {
    val balance: Long = 0

    fun deposit(amount: Long) {
    }
}
"#;

    let file = parse_kt(source);
    let account = find_symbol(&file, "Account");
    assert_eq!(account.kind, "class");
    assert!(account
        .children
        .iter()
        .any(|c| c.name == "deposit" && c.kind == "method"));
    assert!(account
        .children
        .iter()
        .any(|c| c.name == "balance" && c.kind == "field"));
}

#[test]
fn test_kotlin_interface() {
    let source = r#"
interface Repository {
    fun save(id: String)
}
"#;

    let file = parse_kt(source);
    assert_eq!(find_symbol(&file, "Repository").kind, "interface");
}

#[test]
fn test_kotlin_object_declaration() {
    let source = r#"
object Singleton {
    fun instance(): Int = 1
}
"#;

    let file = parse_kt(source);
    assert_eq!(find_symbol(&file, "Singleton").kind, "class");
}

#[test]
fn test_kotlin_top_level_function_and_property() {
    let source = r#"
val limit = 10

fun compute(x: Int): Int {
    return x + limit
}
"#;

    let file = parse_kt(source);
    assert_eq!(find_symbol(&file, "compute").kind, "function");
    assert_eq!(find_symbol(&file, "limit").kind, "variable");
}

#[test]
fn test_kotlin_supertypes() {
    let source = r#"
open class Base

interface Serializable

class Child : Base(), Serializable {
}
"#;

    let file = parse_kt(source);
    assert!(
        file.dependencies.iter().any(|d| {
            d.edge_type == EdgeType::Extends && d.source == "Child" && d.target == "Base"
        }),
        "constructor invocation marks the base class"
    );
    assert!(
        file.dependencies.iter().any(|d| {
            d.edge_type == EdgeType::Implements
                && d.source == "Child"
                && d.target == "Serializable"
        }),
        "bare supertype marks an implemented interface"
    );
}

#[test]
fn test_kotlin_imports() {
    let source = r#"
import kotlinx.coroutines.flow.Flow
import com.example.app.util.Strings

fun main() {
}
"#;

    let dispatcher = ParserDispatcher::with_project_package(Some("com.example.app".to_string()));
    let file = dispatcher
        .parse_source("App.kt", Language::Kotlin, source)
        .unwrap();

    let imports: Vec<_> = file
        .dependencies
        .iter()
        .filter(|d| d.edge_type == EdgeType::Import)
        .collect();
    assert_eq!(imports.len(), 2);

    let flow = imports
        .iter()
        .find(|d| d.target_module == "kotlinx.coroutines.flow.Flow")
        .unwrap();
    assert!(flow.is_external);

    let strings = imports
        .iter()
        .find(|d| d.target_module == "com.example.app.util.Strings")
        .unwrap();
    assert!(!strings.is_external);
}

#[test]
fn test_kotlin_calls() {
    let source = r#"
fun helper(): Int {
    return 1
}

fun main() {
    val x = helper()
}
"#;

    let file = parse_kt(source);
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Call && d.source == "main" && d.target == "helper"
    }));
}

#[test]
fn test_kotlin_enum_class() {
    let source = r#"
enum class Status {
    ACTIVE,
    CLOSED
}
"#;

    let file = parse_kt(source);
    let status = find_symbol(&file, "Status");
    assert_eq!(status.kind, "enum");
    assert!(status
        .children
        .iter()
        .any(|c| c.name == "ACTIVE" && c.kind == "enum_constant"));
}
