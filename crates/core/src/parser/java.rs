//! Java language parser using Tree-sitter

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// Java language parser
pub struct JavaParser {
    /// Imports under this package prefix are repository-local.
    project_package: Option<String>,
}

impl JavaParser {
    pub fn new(project_package: Option<String>) -> Self {
        Self { project_package }
    }

    fn extract(&self, root: Node, source: &str, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(sym) = self.extract_package(&child, source) {
                        out.symbols.push(sym);
                    }
                }
                "import_declaration" => {
                    self.extract_import(&child, source, out);
                }
                "class_declaration" | "record_declaration" => {
                    if let Some(sym) = self.extract_class(&child, source, out) {
                        out.symbols.push(sym);
                    }
                }
                "interface_declaration" => {
                    if let Some(sym) = self.extract_interface(&child, source, out) {
                        out.symbols.push(sym);
                    }
                }
                "enum_declaration" => {
                    if let Some(sym) = self.extract_enum(&child, source, out) {
                        out.symbols.push(sym);
                    }
                }
                _ => {}
            }
        }
        self.extract_calls(&root, source, out);
    }

    fn extract_package(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let mut cursor = node.walk();
        let name = node
            .children(&mut cursor)
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
            .map(|c| engine::node_text(&c, source).to_string())?;
        Some(ParsedSymbol {
            name,
            kind: "package".to_string(),
            signature: engine::node_text(node, source).trim_end_matches(';').to_string(),
            span: Span::of_node(node),
            docstring: String::new(),
            children: Vec::new(),
        })
    }

    fn extract_import(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        let mut full_path = String::new();
        let mut is_wildcard = false;

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "scoped_identifier" | "identifier" => {
                    full_path = engine::node_text(&child, source).to_string();
                }
                "asterisk" => is_wildcard = true,
                _ => {}
            }
        }
        if full_path.is_empty() {
            return;
        }
        if is_wildcard {
            full_path.push_str(".*");
        }

        let is_local = self
            .project_package
            .as_deref()
            .is_some_and(|root| full_path.starts_with(root));
        out.dependencies
            .push(ParsedDependency::import(full_path, !is_local));
    }

    fn extract_class(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let class_name = engine::node_text(&name_node, source).to_string();

        if let Some(superclass) = node.child_by_field_name("superclass") {
            for base in type_names(&superclass, source) {
                out.dependencies.push(ParsedDependency::typed(
                    EdgeType::Extends,
                    class_name.clone(),
                    base,
                ));
            }
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            for iface in type_names(&interfaces, source) {
                out.dependencies.push(ParsedDependency::typed(
                    EdgeType::Implements,
                    class_name.clone(),
                    iface,
                ));
            }
        }

        let members = self.extract_members(node, source);

        Some(ParsedSymbol {
            name: class_name,
            kind: "class".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_interface(
        &self,
        node: &Node,
        source: &str,
        out: &mut ParsedFile,
    ) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();

        // `interface A extends B, C`
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "extends_interfaces" {
                for base in type_names(&child, source) {
                    out.dependencies.push(ParsedDependency::typed(
                        EdgeType::Extends,
                        name.clone(),
                        base,
                    ));
                }
            }
        }

        let members = self.extract_members(node, source);

        Some(ParsedSymbol {
            name,
            kind: "interface".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: members,
        })
    }

    fn extract_enum(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();

        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            for iface in type_names(&interfaces, source) {
                out.dependencies.push(ParsedDependency::typed(
                    EdgeType::Implements,
                    name.clone(),
                    iface,
                ));
            }
        }

        let mut constants = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                if child.kind() == "enum_constant" {
                    if let Some(id) = child.child_by_field_name("name") {
                        constants.push(ParsedSymbol {
                            name: engine::node_text(&id, source).to_string(),
                            kind: "enum_constant".to_string(),
                            signature: engine::node_text(&child, source).to_string(),
                            span: Span::of_node(&child),
                            docstring: String::new(),
                            children: Vec::new(),
                        });
                    }
                } else if child.kind() == "enum_body_declarations" {
                    let mut dc = child.walk();
                    for decl in child.children(&mut dc) {
                        if let Some(sym) = self.extract_member(&decl, source) {
                            constants.push(sym);
                        }
                    }
                }
            }
        }

        Some(ParsedSymbol {
            name,
            kind: "enum".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: constants,
        })
    }

    fn extract_members(&self, node: &Node, source: &str) -> Vec<ParsedSymbol> {
        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                if let Some(sym) = self.extract_member(&child, source) {
                    members.push(sym);
                }
            }
        }
        members
    }

    fn extract_member(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        match node.kind() {
            "method_declaration" | "constructor_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| engine::node_text(&n, source).to_string())?;
                Some(ParsedSymbol {
                    name,
                    kind: "method".to_string(),
                    signature: signature_text(node, source, &['{', ';']),
                    span: Span::of_node(node),
                    docstring: doc_comment_before(node, source),
                    children: Vec::new(),
                })
            }
            "field_declaration" => {
                let mut cursor = node.walk();
                let declarator = node
                    .children(&mut cursor)
                    .find(|c| c.kind() == "variable_declarator")?;
                let name = declarator
                    .child_by_field_name("name")
                    .map(|n| engine::node_text(&n, source).to_string())?;
                Some(ParsedSymbol {
                    name,
                    kind: "field".to_string(),
                    signature: signature_text(node, source, &['=', ';']),
                    span: Span::of_node(node),
                    docstring: String::new(),
                    children: Vec::new(),
                })
            }
            _ => None,
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
        current_method: Option<String>,
    ) {
        let node = cursor.node();

        let new_context = if matches!(
            node.kind(),
            "method_declaration" | "constructor_declaration"
        ) {
            node.child_by_field_name("name")
                .map(|n| engine::node_text(&n, source).to_string())
                .or(current_method.clone())
        } else {
            current_method.clone()
        };

        if node.kind() == "method_invocation" {
            if let (Some(caller), Some(name)) = (&new_context, node.child_by_field_name("name")) {
                out.dependencies.push(ParsedDependency::call(
                    caller,
                    engine::node_text(&name, source),
                ));
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
}

impl LanguageParser for JavaParser {
    fn language_name(&self) -> &str {
        "java"
    }

    fn handles(&self) -> &[Language] {
        &[Language::Java]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::Java)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file);
        Ok(file)
    }
}

/// Type identifiers under a superclass/interfaces clause.
fn type_names(node: &Node, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    collect_type_names(node, source, &mut out);
    out
}

fn collect_type_names(node: &Node, source: &str, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type_identifier" => out.push(engine::node_text(&child, source).to_string()),
            "generic_type" => {
                // Base name without type arguments
                if let Some(base) = child.child(0) {
                    if base.kind() == "type_identifier" {
                        out.push(engine::node_text(&base, source).to_string());
                    }
                }
            }
            "type_list" | "scoped_type_identifier" => collect_type_names(&child, source, out),
            _ => {}
        }
    }
}
