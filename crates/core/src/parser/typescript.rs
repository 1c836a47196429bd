//! TypeScript/JavaScript language parser using Tree-sitter
//!
//! One parser covers both languages: the grammars share their statement
//! vocabulary, TypeScript adding interfaces, type aliases, and enums.

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// TypeScript language parser (also handles JavaScript)
pub struct TypeScriptParser;

impl TypeScriptParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit_toplevel(&child, source, out);
        }
        self.extract_calls(&root, source, out);
    }

    fn visit_toplevel(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(sym) = self.extract_function(node, source) {
                    out.symbols.push(sym);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(sym) = self.extract_class(node, source, out) {
                    out.symbols.push(sym);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                self.extract_variables(node, source, out);
            }
            "interface_declaration" => {
                if let Some(sym) = self.extract_named(node, source, "interface", &['{']) {
                    out.symbols.push(sym);
                }
            }
            "type_alias_declaration" => {
                if let Some(sym) = self.extract_named(node, source, "typedef", &['=']) {
                    out.symbols.push(sym);
                }
            }
            "enum_declaration" => {
                if let Some(sym) = self.extract_named(node, source, "enum", &['{']) {
                    out.symbols.push(sym);
                }
            }
            "internal_module" => {
                if let Some(sym) = self.extract_named(node, source, "module", &['{']) {
                    out.symbols.push(sym);
                }
            }
            "import_statement" => {
                self.extract_import(node, source, out);
            }
            "export_statement" => {
                if let Some(decl) = node.child_by_field_name("declaration") {
                    self.visit_toplevel(&decl, source, out);
                }
            }
            _ => {}
        }
    }

    fn extract_function(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: "function".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_named(
        &self,
        node: &Node,
        source: &str,
        kind: &str,
        stops: &[char],
    ) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: kind.to_string(),
            signature: signature_text(node, source, stops),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_class(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let class_name = engine::node_text(&name_node, source).to_string();

        self.extract_heritage(node, source, &class_name, out);

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "method_definition" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            members.push(ParsedSymbol {
                                name: engine::node_text(&name, source).to_string(),
                                kind: "method".to_string(),
                                signature: signature_text(&child, source, &['{']),
                                span: Span::of_node(&child),
                                docstring: doc_comment_before(&child, source),
                                children: Vec::new(),
                            });
                        }
                    }
                    "public_field_definition" | "field_definition" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            members.push(ParsedSymbol {
                                name: engine::node_text(&name, source).to_string(),
                                kind: "field".to_string(),
                                signature: signature_text(&child, source, &['=', ';']),
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
            name: class_name,
            kind: "class".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    /// `extends` / `implements` clauses (TS) or the bare heritage expression (JS).
    fn extract_heritage(&self, node: &Node, source: &str, class_name: &str, out: &mut ParsedFile) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "class_heritage" {
                continue;
            }
            let mut hc = child.walk();
            let mut saw_clause = false;
            for clause in child.children(&mut hc) {
                match clause.kind() {
                    "extends_clause" => {
                        saw_clause = true;
                        for base in named_descendant_identifiers(&clause, source) {
                            out.dependencies.push(ParsedDependency::typed(
                                EdgeType::Extends,
                                class_name,
                                base,
                            ));
                        }
                    }
                    "implements_clause" => {
                        saw_clause = true;
                        for base in named_descendant_identifiers(&clause, source) {
                            out.dependencies.push(ParsedDependency::typed(
                                EdgeType::Implements,
                                class_name,
                                base,
                            ));
                        }
                    }
                    _ => {}
                }
            }
            if !saw_clause {
                // JavaScript grammar: class_heritage wraps the expression directly
                for base in named_descendant_identifiers(&child, source) {
                    out.dependencies.push(ParsedDependency::typed(
                        EdgeType::Extends,
                        class_name,
                        base,
                    ));
                }
            }
        }
    }

    fn extract_variables(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                continue;
            }
            let name = engine::node_text(&name_node, source).to_string();

            let value = child.child_by_field_name("value");
            // `const m = require('mod')` is an import, not a variable
            if let Some(value) = value {
                if let Some(spec) = require_specifier(&value, source) {
                    self.push_import(&spec, out);
                    continue;
                }
            }

            let kind = match value.map(|v| v.kind()) {
                Some("arrow_function") | Some("function_expression") | Some("function") => {
                    "function"
                }
                _ => "variable",
            };

            out.symbols.push(ParsedSymbol {
                name,
                kind: kind.to_string(),
                signature: signature_text(node, source, &['=']),
                span: Span::of_node(node),
                docstring: doc_comment_before(node, source),
                children: Vec::new(),
            });
        }
    }

    fn extract_import(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let spec = engine::node_text(&source_node, source)
            .trim_matches(|c| c == '\'' || c == '"')
            .to_string();
        if !spec.is_empty() {
            self.push_import(&spec, out);
        }
    }

    fn push_import(&self, spec: &str, out: &mut ParsedFile) {
        // Relative or absolute specifiers are repository-local; bare
        // specifiers, including Node built-ins like `fs` or `node:path`,
        // are external.
        let is_local = spec.starts_with('.') || spec.starts_with('/');
        out.dependencies
            .push(ParsedDependency::import(spec, !is_local));
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

        let new_context = match node.kind() {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                node.child_by_field_name("name")
                    .map(|n| engine::node_text(&n, source).to_string())
                    .or(current_function.clone())
            }
            // `const f = () => …` — the declarator names the function
            "variable_declarator" => {
                let is_fn = node
                    .child_by_field_name("value")
                    .map(|v| {
                        matches!(v.kind(), "arrow_function" | "function_expression" | "function")
                    })
                    .unwrap_or(false);
                if is_fn {
                    node.child_by_field_name("name")
                        .map(|n| engine::node_text(&n, source).to_string())
                        .or(current_function.clone())
                } else {
                    current_function.clone()
                }
            }
            _ => current_function.clone(),
        };

        if node.kind() == "call_expression" {
            if let Some(caller) = &new_context {
                if let Some(callee) = self.call_target(&node, source) {
                    if callee != "require" {
                        out.dependencies.push(ParsedDependency::call(caller, callee));
                    }
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
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "identifier" => Some(engine::node_text(&func, source).to_string()),
            // obj.method(): rightmost name
            "member_expression" => func
                .child_by_field_name("property")
                .map(|p| engine::node_text(&p, source).to_string()),
            _ => Some(engine::node_text(&func, source).to_string()),
        }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TypeScriptParser {
    fn language_name(&self) -> &str {
        "typescript/javascript"
    }

    fn handles(&self) -> &[Language] {
        &[Language::TypeScript, Language::JavaScript]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, language)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file);
        Ok(file)
    }
}

/// The string argument of a `require(…)` call, when `node` is one.
fn require_specifier(node: &Node, source: &str) -> Option<String> {
    if node.kind() != "call_expression" {
        return None;
    }
    let func = node.child_by_field_name("function")?;
    if func.kind() != "identifier" || engine::node_text(&func, source) != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let first = args.named_child(0)?;
    if first.kind() != "string" {
        return None;
    }
    Some(
        engine::node_text(&first, source)
            .trim_matches(|c| c == '\'' || c == '"')
            .to_string(),
    )
}

/// Identifier-ish leaves under a heritage clause.
fn named_descendant_identifiers(node: &Node, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "type_identifier" => {
                out.push(engine::node_text(&child, source).to_string());
            }
            "generic_type" | "member_expression" | "nested_type_identifier" => {
                out.push(engine::node_text(&child, source).to_string());
            }
            _ => {}
        }
    }
    out
}
