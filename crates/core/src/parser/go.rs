//! Go language parser using Tree-sitter
//!
//! Symbol extraction walks the tree directly; imports and call sites go
//! through the engine's query API.

use super::docs::{doc_comment_before, header_before_body, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedNode, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::Span;
use tree_sitter::Node;

const IMPORT_QUERY: &str = r#"(import_spec path: (interpreted_string_literal) @path)"#;
const CALL_QUERY: &str = r#"(call_expression function: (_) @callee)"#;

/// Go language parser
pub struct GoParser;

impl GoParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) -> Result<(), ParseError> {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    if let Some(sym) = self.extract_package(&child, source) {
                        out.symbols.push(sym);
                    }
                }
                "function_declaration" => {
                    if let Some(sym) = self.extract_function(&child, source, "function") {
                        out.symbols.push(sym);
                    }
                }
                "method_declaration" => {
                    if let Some(sym) = self.extract_function(&child, source, "method") {
                        out.symbols.push(sym);
                    }
                }
                "type_declaration" => {
                    let mut spec_cursor = child.walk();
                    for spec in child.children(&mut spec_cursor) {
                        if matches!(spec.kind(), "type_spec" | "type_alias") {
                            if let Some(sym) = self.extract_type_spec(&spec, &child, source) {
                                out.symbols.push(sym);
                            }
                        }
                    }
                }
                "const_declaration" => {
                    self.extract_value_specs(&child, source, "constant", out);
                }
                "var_declaration" => {
                    self.extract_value_specs(&child, source, "variable", out);
                }
                _ => {}
            }

            if child.is_named() && child.kind() != "comment" {
                out.nodes.push(ParsedNode {
                    node_type: child.kind().to_string(),
                    span: Span::of_node(&child),
                    text: header_before_body(engine::node_text(&child, source), &['{'])
                        .trim()
                        .to_string(),
                    attributes: Default::default(),
                });
            }
        }

        self.extract_imports(root, source, out)?;
        self.extract_calls(root, source, out)?;
        Ok(())
    }

    fn extract_package(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let mut cursor = node.walk();
        let name = node
            .children(&mut cursor)
            .find(|c| c.kind() == "package_identifier")
            .map(|c| engine::node_text(&c, source).to_string())?;
        Some(ParsedSymbol {
            name,
            kind: "package".to_string(),
            signature: engine::node_text(node, source).to_string(),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_function(&self, node: &Node, source: &str, kind: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_type_spec(&self, spec: &Node, decl: &Node, source: &str) -> Option<ParsedSymbol> {
        let name_node = spec.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();
        let type_node = spec.child_by_field_name("type");

        let (kind, children) = match type_node.map(|t| t.kind()) {
            Some("struct_type") => (
                "struct",
                self.extract_struct_fields(&type_node.unwrap_or(*spec), source),
            ),
            Some("interface_type") => ("interface", Vec::new()),
            _ => ("type", Vec::new()),
        };

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(spec, source, &['{']),
            span: Span::of_node(spec),
            docstring: doc_comment_before(decl, source),
            children,
        })
    }

    fn extract_struct_fields(&self, struct_type: &Node, source: &str) -> Vec<ParsedSymbol> {
        let mut fields = Vec::new();
        let mut cursor = struct_type.walk();
        for child in struct_type.children(&mut cursor) {
            if child.kind() != "field_declaration_list" {
                continue;
            }
            let mut fc = child.walk();
            for field in child.children(&mut fc) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                let mut names = field.walk();
                for name_node in field.children(&mut names) {
                    if name_node.kind() == "field_identifier" {
                        fields.push(ParsedSymbol {
                            name: engine::node_text(&name_node, source).to_string(),
                            kind: "field".to_string(),
                            signature: engine::node_text(&field, source).to_string(),
                            span: Span::of_node(&field),
                            docstring: String::new(),
                            children: Vec::new(),
                        });
                    }
                }
            }
        }
        fields
    }

    fn extract_value_specs(&self, decl: &Node, source: &str, kind: &str, out: &mut ParsedFile) {
        let mut cursor = decl.walk();
        for spec in decl.children(&mut cursor) {
            if !matches!(spec.kind(), "const_spec" | "var_spec") {
                continue;
            }
            let mut sc = spec.walk();
            for name_node in spec.children(&mut sc) {
                if name_node.kind() == "identifier" {
                    out.symbols.push(ParsedSymbol {
                        name: engine::node_text(&name_node, source).to_string(),
                        kind: kind.to_string(),
                        signature: signature_text(&spec, source, &['=']),
                        span: Span::of_node(&spec),
                        docstring: doc_comment_before(decl, source),
                        children: Vec::new(),
                    });
                }
            }
        }
    }

    fn extract_imports(
        &self,
        root: Node,
        source: &str,
        out: &mut ParsedFile,
    ) -> Result<(), ParseError> {
        for m in engine::query_matches(root, IMPORT_QUERY, Language::Go, source)? {
            for capture in m {
                let path = engine::node_text(&capture.node, source)
                    .trim_matches('"')
                    .to_string();
                if path.is_empty() {
                    continue;
                }
                // Domain-qualified paths (github.com/…) are external; plain
                // paths (fmt, net/http) are the standard library.
                let first_segment = path.split('/').next().unwrap_or(&path);
                let dep = if first_segment.contains('.') {
                    ParsedDependency::import(path, true)
                } else {
                    ParsedDependency::stdlib_import(path)
                };
                out.dependencies.push(dep);
            }
        }
        Ok(())
    }

    fn extract_calls(
        &self,
        root: Node,
        source: &str,
        out: &mut ParsedFile,
    ) -> Result<(), ParseError> {
        for m in engine::query_matches(root, CALL_QUERY, Language::Go, source)? {
            for capture in m {
                let Some(caller) = enclosing_function_name(&capture.node, source) else {
                    continue; // call outside any function body
                };
                let callee = match capture.node.kind() {
                    "identifier" => engine::node_text(&capture.node, source).to_string(),
                    // pkg.Fn() / recv.Method(): rightmost name
                    "selector_expression" => capture
                        .node
                        .child_by_field_name("field")
                        .map(|f| engine::node_text(&f, source).to_string())
                        .unwrap_or_default(),
                    _ => engine::node_text(&capture.node, source).to_string(),
                };
                if !callee.is_empty() {
                    out.dependencies.push(ParsedDependency::call(caller, callee));
                }
            }
        }
        Ok(())
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for GoParser {
    fn language_name(&self) -> &str {
        "go"
    }

    fn handles(&self) -> &[Language] {
        &[Language::Go]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::Go)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file)?;
        Ok(file)
    }
}

/// Innermost enclosing function or method name for a node, if any.
fn enclosing_function_name(node: &Node, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "function_declaration" | "method_declaration") {
            return n
                .child_by_field_name("name")
                .map(|name| engine::node_text(&name, source).to_string());
        }
        // Function literals belong to their enclosing named function
        current = n.parent();
    }
    None
}
