//! Objective-C language parser using Tree-sitter
//!
//! The Objective-C grammar extends the C grammar, so plain C constructs
//! (functions, macros, includes) are handled alongside `@interface`,
//! `@implementation`, `@protocol`, and their members. Method selectors are
//! recovered from the declaration header text, which keeps extraction stable
//! across grammar revisions.

use super::docs::{doc_comment_before, header_before_body, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::Node;

/// Objective-C language parser
pub struct ObjCParser;

impl ObjCParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit_toplevel(&child, source, out);
        }
        let mut call_cursor = root.walk();
        self.extract_calls(&mut call_cursor, source, out, None);
    }

    fn visit_toplevel(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        match node.kind() {
            "class_interface" | "category_interface" => {
                if let Some(sym) = self.extract_container(node, source, "interface", out) {
                    out.symbols.push(sym);
                }
            }
            "class_implementation" | "category_implementation" => {
                if let Some(sym) = self.extract_container(node, source, "implementation", out) {
                    out.symbols.push(sym);
                }
            }
            "protocol_declaration" => {
                if let Some(sym) = self.extract_container(node, source, "protocol", out) {
                    out.symbols.push(sym);
                }
            }
            "function_definition" => {
                if let Some(sym) = self.extract_function(node, source) {
                    out.symbols.push(sym);
                }
            }
            "declaration" => {
                // C function prototype in a promoted header
                let text = engine::node_text(node, source);
                if text.contains('(') {
                    if let Some(sym) = self.extract_function(node, source) {
                        out.symbols.push(sym);
                    }
                }
            }
            "preproc_include" | "preproc_import" => {
                if let Some(dep) = self.extract_import(node, source) {
                    out.dependencies.push(dep);
                }
            }
            "preproc_def" => {
                if let Some(sym) = self.extract_macro(node, source) {
                    out.symbols.push(sym);
                }
            }
            "preproc_ifdef" | "preproc_if" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit_toplevel(&child, source, out);
                }
            }
            _ => {}
        }
    }

    /// `@interface`, `@implementation`, or `@protocol` with its methods and
    /// properties as children.
    fn extract_container(
        &self,
        node: &Node,
        source: &str,
        kind: &str,
        out: &mut ParsedFile,
    ) -> Option<ParsedSymbol> {
        let name = container_name(node, source)?;

        if kind == "interface" {
            // superclass: `@interface Foo : NSObject`
            if let Some(superclass) = node
                .child_by_field_name("superclass")
                .or_else(|| find_child_by_kind(node, "superclass_reference"))
            {
                let base = engine::node_text(&superclass, source)
                    .trim_start_matches(':')
                    .trim()
                    .to_string();
                if !base.is_empty() && base != name {
                    out.dependencies.push(ParsedDependency::typed(
                        EdgeType::Extends,
                        name.clone(),
                        base,
                    ));
                }
            }
        }

        // Protocol conformances: `<NSCoding, NSCopying>`
        for protocol in protocol_references(node, source, &name) {
            out.dependencies.push(ParsedDependency::typed(
                EdgeType::Implements,
                name.clone(),
                protocol,
            ));
        }

        let mut members = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "method_declaration" | "method_definition" => {
                    if let Some(sym) = self.extract_method(&child, source) {
                        members.push(sym);
                    }
                }
                "property_declaration" => {
                    if let Some(sym) = self.extract_property(&child, source) {
                        members.push(sym);
                    }
                }
                _ => {}
            }
        }

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: first_line(engine::node_text(node, source)),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_method(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let header = header_before_body(engine::node_text(node, source), &['{', ';']);
        let name = selector_from_header(header)?;
        Some(ParsedSymbol {
            name,
            kind: "method".to_string(),
            signature: signature_text(node, source, &['{', ';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_property(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        // The property name is the last identifier before the ';'
        let header = header_before_body(engine::node_text(node, source), &[';']);
        let name = header
            .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
            .find(|s| !s.is_empty())?
            .to_string();
        Some(ParsedSymbol {
            name,
            kind: "property".to_string(),
            signature: signature_text(node, source, &[';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_function(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        // C function inside an Objective-C file
        let header = header_before_body(engine::node_text(node, source), &['{', ';']);
        let name = c_function_name(header)?;
        Some(ParsedSymbol {
            name,
            kind: "function".to_string(),
            signature: signature_text(node, source, &['{', ';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_macro(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: "macro".to_string(),
            signature: first_line(engine::node_text(node, source)),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    /// Call edges: C-style calls and message sends inside method or function
    /// bodies. The caller is the innermost enclosing definition.
    fn extract_calls(
        &self,
        cursor: &mut tree_sitter::TreeCursor,
        source: &str,
        out: &mut ParsedFile,
        current: Option<String>,
    ) {
        let node = cursor.node();

        let new_context = match node.kind() {
            "method_definition" => {
                let header = header_before_body(engine::node_text(&node, source), &['{', ';']);
                selector_from_header(header).or(current.clone())
            }
            "function_definition" => {
                let header = header_before_body(engine::node_text(&node, source), &['{', ';']);
                c_function_name(header).or(current.clone())
            }
            _ => current.clone(),
        };

        if let Some(caller) = &new_context {
            match node.kind() {
                "call_expression" => {
                    if let Some(func) = node.child_by_field_name("function") {
                        let callee = engine::node_text(&func, source).to_string();
                        if !callee.is_empty() {
                            out.dependencies.push(ParsedDependency::call(caller, callee));
                        }
                    }
                }
                "message_expression" => {
                    if let Some(selector) =
                        selector_from_message(engine::node_text(&node, source))
                    {
                        out.dependencies.push(ParsedDependency::call(caller, selector));
                    }
                }
                _ => {}
            }
        }

        if cursor.goto_first_child() {
            loop {
                self.extract_calls(cursor, source, out, new_context.clone());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    fn extract_import(&self, node: &Node, source: &str) -> Option<ParsedDependency> {
        let path_node = node
            .child_by_field_name("path")
            .or_else(|| find_child_by_kind(node, "system_lib_string"))
            .or_else(|| find_child_by_kind(node, "string_literal"))?;
        let is_system = path_node.kind() == "system_lib_string";
        let path = engine::node_text(&path_node, source)
            .trim_matches('"')
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string();
        if path.is_empty() {
            return None;
        }
        // Framework imports (<Foundation/Foundation.h>) are external;
        // quoted imports are repository-local.
        Some(ParsedDependency::import(path, is_system))
    }
}

impl Default for ObjCParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for ObjCParser {
    fn language_name(&self) -> &str {
        "objc"
    }

    fn handles(&self) -> &[Language] {
        &[Language::ObjC]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::ObjC)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file);
        Ok(file)
    }
}

fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

/// Name of an `@interface`/`@implementation`/`@protocol` container.
fn container_name(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .or_else(|| find_child_by_kind(node, "identifier"))
        .map(|n| engine::node_text(&n, source).to_string())
        .filter(|n| !n.is_empty())
}

/// Protocols referenced in a `<P1, P2>` conformance list.
fn protocol_references(node: &Node, source: &str, own_name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(
            child.kind(),
            "protocol_reference_list" | "protocol_qualifiers" | "parameterized_class_type_arguments"
        ) {
            let mut pc = child.walk();
            for p in child.children(&mut pc) {
                if p.kind() == "identifier" {
                    let name = engine::node_text(&p, source).to_string();
                    if name != own_name {
                        out.push(name);
                    }
                }
            }
        }
    }
    out
}

/// Recover a selector like `setName:age:` from a method header such as
/// `- (void)setName:(NSString *)name age:(NSInteger)age`.
fn selector_from_header(header: &str) -> Option<String> {
    let header = header.trim();
    let rest = header.strip_prefix(['-', '+']).unwrap_or(header).trim();

    // Skip the parenthesized return type
    let rest = if let Some(stripped) = rest.strip_prefix('(') {
        let close = matching_paren(stripped)?;
        stripped[close + 1..].trim()
    } else {
        rest
    };

    let mut selector = String::new();
    let mut word = String::new();
    let mut depth = 0i32;
    for ch in rest.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ':' if depth == 0 => {
                if !word.is_empty() {
                    selector.push_str(&word);
                    selector.push(':');
                    word.clear();
                }
            }
            c if depth == 0 && (c.is_alphanumeric() || c == '_') => word.push(c),
            _ if depth == 0 => word.clear(),
            _ => {}
        }
    }

    if selector.is_empty() {
        // Unary selector: `- (void)reset`
        let first_word: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if first_word.is_empty() {
            None
        } else {
            Some(first_word)
        }
    } else {
        Some(selector)
    }
}

/// Selector of a message send: words immediately preceding a `:` outside
/// strings and nesting, or the final word of a unary send.
fn selector_from_message(text: &str) -> Option<String> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    let mut selector = String::new();
    let mut word = String::new();
    let mut last_word = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in inner.chars() {
        if in_string {
            if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' => {
                depth += 1;
                word.clear();
            }
            ')' | ']' => {
                depth -= 1;
                word.clear();
            }
            ':' if depth == 0 => {
                if !word.is_empty() {
                    selector.push_str(&word);
                    selector.push(':');
                    word.clear();
                }
            }
            c if depth == 0 && (c.is_alphanumeric() || c == '_') => word.push(c),
            _ => {
                if !word.is_empty() {
                    last_word = std::mem::take(&mut word);
                }
            }
        }
    }
    if !word.is_empty() {
        last_word = word;
    }

    if !selector.is_empty() {
        Some(selector)
    } else if !last_word.is_empty() {
        Some(last_word)
    } else {
        None
    }
}

fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 1i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Function name from a C-style header: the last identifier before the
/// parameter list.
fn c_function_name(header: &str) -> Option<String> {
    let open = header.find('(')?;
    let before = &header[..open];
    let name: String = before
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}
