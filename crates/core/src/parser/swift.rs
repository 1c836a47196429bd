//! Swift language parser using Tree-sitter
//!
//! The Swift grammar folds class, struct, enum, extension, and actor
//! declarations into one `class_declaration` node; the introducing keyword
//! decides the symbol kind.

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// Swift language parser
pub struct SwiftParser;

impl SwiftParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_declaration" => self.extract_import(&child, source, out),
                "class_declaration" => {
                    let kind = match declaration_keyword(&child, source).as_deref() {
                        Some("struct") => "struct",
                        Some("enum") => "enum",
                        Some("extension") => "extension",
                        _ => "class",
                    };
                    if let Some(sym) = self.extract_type(&child, source, kind, out) {
                        out.symbols.push(sym);
                    }
                }
                "protocol_declaration" => {
                    if let Some(sym) = self.extract_protocol(&child, source, out) {
                        out.symbols.push(sym);
                    }
                }
                "function_declaration" => {
                    if let Some(sym) = self.extract_function(&child, source, "function") {
                        out.symbols.push(sym);
                    }
                }
                "property_declaration" => {
                    if let Some(sym) = self.extract_property(&child, source) {
                        out.symbols.push(sym);
                    }
                }
                "typealias_declaration" => {
                    if let Some(sym) = self.extract_typealias(&child, source) {
                        out.symbols.push(sym);
                    }
                }
                _ => {}
            }
        }
        self.extract_calls(&root, source, out);
    }

    fn extract_import(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        let mut parts = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" {
                let mut ic = child.walk();
                let inner: Vec<_> = child
                    .children(&mut ic)
                    .filter(|c| c.kind() == "simple_identifier")
                    .collect();
                if inner.is_empty() {
                    parts.push(engine::node_text(&child, source).to_string());
                } else {
                    for id in inner {
                        parts.push(engine::node_text(&id, source).to_string());
                    }
                }
            } else if child.kind() == "simple_identifier" {
                parts.push(engine::node_text(&child, source).to_string());
            }
        }
        if parts.is_empty() {
            return;
        }
        // Framework imports never live inside the repository
        out.dependencies
            .push(ParsedDependency::import(parts.join("."), true));
    }

    fn extract_type(
        &self,
        node: &Node,
        source: &str,
        kind: &str,
        out: &mut ParsedFile,
    ) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;

        // First inheritance entry is the superclass candidate; the rest are
        // protocol conformances.
        for (i, base) in inheritance_types(node, source).into_iter().enumerate() {
            let edge = if i == 0 && kind == "class" {
                EdgeType::Extends
            } else {
                EdgeType::Implements
            };
            out.dependencies
                .push(ParsedDependency::typed(edge, name.clone(), base));
        }

        let mut members = Vec::new();
        let body = find_child_by_kind(node, "class_body")
            .or_else(|| find_child_by_kind(node, "enum_class_body"));
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "function_declaration" => {
                        if let Some(sym) = self.extract_function(&child, source, "method") {
                            members.push(sym);
                        }
                    }
                    "init_declaration" => {
                        members.push(ParsedSymbol {
                            name: "init".to_string(),
                            kind: "method".to_string(),
                            signature: signature_text(&child, source, &['{']),
                            span: Span::of_node(&child),
                            docstring: doc_comment_before(&child, source),
                            children: Vec::new(),
                        });
                    }
                    "property_declaration" => {
                        if let Some(mut sym) = self.extract_property(&child, source) {
                            sym.kind = "field".to_string();
                            members.push(sym);
                        }
                    }
                    "enum_entry" => {
                        if let Some(id) = find_child_by_kind(&child, "simple_identifier") {
                            members.push(ParsedSymbol {
                                name: engine::node_text(&id, source).to_string(),
                                kind: "enum_constant".to_string(),
                                signature: engine::node_text(&child, source).to_string(),
                                span: Span::of_node(&child),
                                docstring: String::new(),
                                children: Vec::new(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_protocol(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;

        for base in inheritance_types(node, source) {
            out.dependencies
                .push(ParsedDependency::typed(EdgeType::Extends, name.clone(), base));
        }

        let mut members = Vec::new();
        if let Some(body) = find_child_by_kind(node, "protocol_body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                if child.kind() == "protocol_function_declaration" {
                    if let Some(sym) = self.extract_function(&child, source, "method") {
                        members.push(sym);
                    }
                }
            }
        }

        Some(ParsedSymbol {
            name,
            kind: "protocol".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_function(&self, node: &Node, source: &str, kind: &str) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;
        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_property(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name = property_name(node, source)?;
        Some(ParsedSymbol {
            name,
            kind: "variable".to_string(),
            signature: signature_text(node, source, &['=', '{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_typealias(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;
        Some(ParsedSymbol {
            name,
            kind: "typedef".to_string(),
            signature: signature_text(node, source, &['=']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_calls(&self, root: &Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        self.extract_calls_recursive(&mut cursor, source, out, None);
    }

    fn extract_calls_recursive(
        &self,
        cursor: &mut TreeCursor,
        source: &str,
        out: &mut ParsedFile,
        current_function: Option<String>,
    ) {
        let node = cursor.node();

        let new_context = if node.kind() == "function_declaration" {
            node_name(&node, source).or(current_function.clone())
        } else {
            current_function.clone()
        };

        if node.kind() == "call_expression" {
            if let Some(caller) = &new_context {
                if let Some(callee) = self.call_target(&node, source) {
                    out.dependencies.push(ParsedDependency::call(caller, callee));
                }
            }
        }

        if cursor.goto_first_child() {
            loop {
                self.extract_calls_recursive(cursor, source, out, new_context.clone());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    fn call_target(&self, node: &Node, source: &str) -> Option<String> {
        let first = node.child(0)?;
        match first.kind() {
            "simple_identifier" => Some(engine::node_text(&first, source).to_string()),
            // obj.method(): rightmost name
            "navigation_expression" => {
                if let Some(suffix) = first.child_by_field_name("suffix") {
                    let name = engine::node_text(&suffix, source);
                    return Some(name.trim_start_matches('.').to_string());
                }
                let mut cursor = first.walk();
                first
                    .children(&mut cursor)
                    .filter(|c| c.kind() == "simple_identifier")
                    .last()
                    .map(|n| engine::node_text(&n, source).to_string())
            }
            _ => None,
        }
    }
}

impl Default for SwiftParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for SwiftParser {
    fn language_name(&self) -> &str {
        "swift"
    }

    fn handles(&self) -> &[Language] {
        &[Language::Swift]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::Swift)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file);
        Ok(file)
    }
}

fn node_name(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| engine::node_text(&n, source).to_string())
        .or_else(|| {
            find_child_by_kind(node, "type_identifier")
                .or_else(|| find_child_by_kind(node, "simple_identifier"))
                .map(|n| engine::node_text(&n, source).to_string())
        })
}

fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

/// The introducing keyword of a `class_declaration` (class, struct, enum,
/// extension, actor).
fn declaration_keyword(node: &Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() {
            let text = engine::node_text(&child, source);
            if matches!(text, "class" | "struct" | "enum" | "extension" | "actor") {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Types after the inheritance colon, before the body.
fn inheritance_types(node: &Node, source: &str) -> Vec<String> {
    let mut types = Vec::new();
    let mut found_colon = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() && engine::node_text(&child, source) == ":" {
            found_colon = true;
            continue;
        }
        if matches!(
            child.kind(),
            "class_body" | "enum_class_body" | "protocol_body"
        ) {
            break;
        }
        if found_colon && matches!(child.kind(), "inheritance_specifier" | "user_type") {
            let name = find_child_by_kind(&child, "user_type")
                .or_else(|| find_child_by_kind(&child, "type_identifier"))
                .map(|n| engine::node_text(&n, source).to_string())
                .unwrap_or_else(|| engine::node_text(&child, source).to_string());
            types.push(name);
        }
    }
    types
}

/// Property declarations bind their name through a pattern node.
fn property_name(node: &Node, source: &str) -> Option<String> {
    if let Some(pattern) = node.child_by_field_name("name") {
        if let Some(id) = find_child_by_kind(&pattern, "simple_identifier") {
            return Some(engine::node_text(&id, source).to_string());
        }
        return Some(engine::node_text(&pattern, source).to_string());
    }
    let pattern = find_child_by_kind(node, "pattern")?;
    find_child_by_kind(&pattern, "simple_identifier")
        .map(|id| engine::node_text(&id, source).to_string())
        .or_else(|| Some(engine::node_text(&pattern, source).to_string()))
}
