//! Integration tests for the Objective-C parser

use codeatlas_core::parser::ParserDispatcher;
use codeatlas_core::schema::EdgeType;
use codeatlas_core::{Language, ParsedFile, ParsedSymbol};

fn parse_objc(source: &str) -> ParsedFile {
    ParserDispatcher::new()
        .parse_source("Greeter.m", Language::ObjC, source)
        .expect("failed to parse Objective-C source")
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
fn test_objc_interface_with_superclass() {
    let source = r#"
@interface Greeter : NSObject

- (void)greet;

@end
"#;

    let file = parse_objc(source);
    let greeter = find_symbol(&file, "Greeter");
    assert_eq!(greeter.kind, "interface");
    assert!(greeter
        .children
        .iter()
        .any(|c| c.name == "greet" && c.kind == "method"));

    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Extends && d.source == "Greeter" && d.target == "NSObject"
    }));
}

#[test]
fn test_objc_implementation() {
    let source = r#"
@implementation Greeter

- (void)greet {
}

@end
"#;

    let file = parse_objc(source);
    let greeter = find_symbol(&file, "Greeter");
    assert_eq!(greeter.kind, "implementation");
    assert!(greeter.children.iter().any(|c| c.name == "greet"));
}

#[test]
fn test_objc_keyword_selector() {
    let source = r#"
@implementation Greeter

- (void)setName:(NSString *)name age:(int)age {
}

@end
"#;

    let file = parse_objc(source);
    let greeter = find_symbol(&file, "Greeter");
    assert!(
        greeter.children.iter().any(|c| c.name == "setName:age:"),
        "selector should join keyword segments, got {:?}",
        greeter.children.iter().map(|c| &c.name).collect::<Vec<_>>()
    );
}

#[test]
fn test_objc_protocol() {
    let source = r#"
@protocol Serializable

- (NSString *)serialize;

@end
"#;

    let file = parse_objc(source);
    assert_eq!(find_symbol(&file, "Serializable").kind, "protocol");
}

#[test]
fn test_objc_protocol_conformance() {
    let source = r#"
@interface Greeter : NSObject <NSCoding, NSCopying>
@end
"#;

    let file = parse_objc(source);
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Implements && d.source == "Greeter" && d.target == "NSCoding"
    }));
    assert!(file.dependencies.iter().any(|d| {
        d.edge_type == EdgeType::Implements && d.source == "Greeter" && d.target == "NSCopying"
    }));
}

#[test]
fn test_objc_import_classification() {
    let source = r#"
#import <Foundation/Foundation.h>
#import "Greeter.h"
"#;

    let file = parse_objc(source);
    let imports: Vec<_> = file
        .dependencies
        .iter()
        .filter(|d| d.edge_type == EdgeType::Import)
        .collect();
    assert_eq!(imports.len(), 2);

    let foundation = imports
        .iter()
        .find(|d| d.target_module == "Foundation/Foundation.h")
        .unwrap();
    assert!(foundation.is_external, "framework imports are external");

    let local = imports
        .iter()
        .find(|d| d.target_module == "Greeter.h")
        .unwrap();
    assert!(!local.is_external, "quoted imports are local");
}

#[test]
fn test_objc_c_function() {
    let source = r#"
static int clamp(int v, int lo, int hi) {
    return v < lo ? lo : (v > hi ? hi : v);
}
"#;

    let file = parse_objc(source);
    assert_eq!(find_symbol(&file, "clamp").kind, "function");
}
