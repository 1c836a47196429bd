//! Kotlin language parser using Tree-sitter

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// Kotlin language parser
pub struct KotlinParser {
    /// Imports under this package prefix are repository-local.
    project_package: Option<String>,
}

impl KotlinParser {
    pub fn new(project_package: Option<String>) -> Self {
        Self { project_package }
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import" => self.extract_import(&child, source, out),
                "class_declaration" => {
                    if let Some(sym) = self.extract_class(&child, source, out) {
                        out.symbols.push(sym);
                    }
                }
                "object_declaration" => {
                    if let Some(sym) = self.extract_object(&child, source, out) {
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
                _ => {}
            }
        }
        self.extract_calls(&root, source, out);
    }

    fn extract_import(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        let mut module_parts = Vec::new();
        let mut is_wildcard = false;

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "qualified_identifier" => {
                    let mut qc = child.walk();
                    for part in child.children(&mut qc) {
                        if part.kind() == "identifier" {
                            module_parts.push(engine::node_text(&part, source).to_string());
                        }
                    }
                }
                "identifier" if module_parts.is_empty() => {
                    module_parts.push(engine::node_text(&child, source).to_string());
                }
                "*" => is_wildcard = true,
                _ => {}
            }
        }
        if module_parts.is_empty() {
            return;
        }

        let mut module = module_parts.join(".");
        if is_wildcard {
            module.push_str(".*");
        }

        let is_local = self
            .project_package
            .as_deref()
            .is_some_and(|root| module.starts_with(root));
        out.dependencies
            .push(ParsedDependency::import(module, !is_local));
    }

    fn extract_class(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;
        let iface = is_interface(node, source);
        let enum_class = is_enum(node, source);

        self.extract_supertypes(node, source, &name, out);

        let mut members = Vec::new();
        let body =
            find_child_by_kind(node, "class_body").or_else(|| find_child_by_kind(node, "enum_class_body"));
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "function_declaration" => {
                        if let Some(sym) = self.extract_function(&child, source, "method") {
                            members.push(sym);
                        }
                    }
                    "property_declaration" => {
                        if let Some(mut sym) = self.extract_property(&child, source) {
                            sym.kind = "field".to_string();
                            members.push(sym);
                        }
                    }
                    "enum_entry" => {
                        if let Some(entry) = find_child_by_kind(&child, "identifier") {
                            members.push(ParsedSymbol {
                                name: engine::node_text(&entry, source).to_string(),
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

        let kind = if iface {
            "interface"
        } else if enum_class {
            "enum"
        } else {
            "class"
        };

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_object(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let mut sym = self.extract_class(node, source, out)?;
        sym.kind = "class".to_string();
        Some(sym)
    }

    fn extract_function(&self, node: &Node, source: &str, kind: &str) -> Option<ParsedSymbol> {
        let name = node_name(node, source)?;
        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{', '=']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_property(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let var_decl = find_child_by_kind(node, "variable_declaration")?;
        let name_node = find_child_by_kind(&var_decl, "identifier")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: "variable".to_string(),
            signature: signature_text(node, source, &['=']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    /// Supertypes with a constructor invocation are base classes; bare types
    /// are implemented interfaces.
    fn extract_supertypes(&self, node: &Node, source: &str, name: &str, out: &mut ParsedFile) {
        let Some(deleg) = find_child_by_kind(node, "delegation_specifiers") else {
            return;
        };
        let mut cursor = deleg.walk();
        for child in deleg.children(&mut cursor) {
            if child.kind() != "delegation_specifier" {
                continue;
            }
            if let Some(ctor) = find_child_by_kind(&child, "constructor_invocation") {
                if let Some(user_type) = find_child_by_kind(&ctor, "user_type") {
                    out.dependencies.push(ParsedDependency::typed(
                        EdgeType::Extends,
                        name,
                        engine::node_text(&user_type, source),
                    ));
                }
            } else if let Some(user_type) = find_child_by_kind(&child, "user_type") {
                out.dependencies.push(ParsedDependency::typed(
                    EdgeType::Implements,
                    name,
                    engine::node_text(&user_type, source),
                ));
            }
        }
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
            "identifier" | "simple_identifier" => {
                Some(engine::node_text(&first, source).to_string())
            }
            // obj.method(): rightmost name
            "navigation_expression" => {
                let mut cursor = first.walk();
                let last_id = first
                    .children(&mut cursor)
                    .filter(|c| matches!(c.kind(), "identifier" | "simple_identifier"))
                    .last();
                last_id.map(|n| engine::node_text(&n, source).to_string())
            }
            _ => None,
        }
    }
}

impl LanguageParser for KotlinParser {
    fn language_name(&self) -> &str {
        "kotlin"
    }

    fn handles(&self) -> &[Language] {
        &[Language::Kotlin]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::Kotlin)?;
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
        .or_else(|| find_child_by_kind(node, "identifier"))
        .map(|n| engine::node_text(&n, source).to_string())
}

fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

/// A `class_declaration` with an unnamed `interface` keyword child.
fn is_interface(node: &Node, source: &str) -> bool {
    let mut cursor = node.walk();
    let result = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && engine::node_text(&c, source) == "interface");
    result
}

/// A `class_declaration` with `enum` among its modifiers.
fn is_enum(node: &Node, source: &str) -> bool {
    let Some(modifiers) = find_child_by_kind(node, "modifiers") else {
        return false;
    };
    let mut cursor = modifiers.walk();
    let result = modifiers
        .children(&mut cursor)
        .any(|c| c.kind() == "class_modifier" && engine::node_text(&c, source) == "enum");
    result
}
