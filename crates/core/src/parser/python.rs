//! Python language parser using Tree-sitter

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// Top-level standard-library packages. Imports of these are internal to the
/// language rather than external dependencies.
const PYTHON_STDLIB: &[&str] = &[
    "abc",
    "argparse",
    "array",
    "asyncio",
    "base64",
    "bisect",
    "collections",
    "concurrent",
    "configparser",
    "contextlib",
    "copy",
    "csv",
    "dataclasses",
    "datetime",
    "decimal",
    "email",
    "enum",
    "errno",
    "functools",
    "glob",
    "gzip",
    "hashlib",
    "heapq",
    "http",
    "importlib",
    "inspect",
    "io",
    "itertools",
    "json",
    "logging",
    "math",
    "multiprocessing",
    "operator",
    "os",
    "pathlib",
    "pickle",
    "platform",
    "queue",
    "random",
    "re",
    "secrets",
    "select",
    "shutil",
    "signal",
    "socket",
    "sqlite3",
    "stat",
    "statistics",
    "string",
    "struct",
    "subprocess",
    "sys",
    "tarfile",
    "tempfile",
    "textwrap",
    "threading",
    "time",
    "traceback",
    "types",
    "typing",
    "unicodedata",
    "unittest",
    "urllib",
    "uuid",
    "warnings",
    "weakref",
    "xml",
    "zipfile",
    "zlib",
];

/// Python language parser
pub struct PythonParser;

impl PythonParser {
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
            "function_definition" => {
                if let Some(sym) = self.extract_function(node, node, source, "function") {
                    out.symbols.push(sym);
                }
            }
            "class_definition" => {
                if let Some(sym) = self.extract_class(node, node, source, out) {
                    out.symbols.push(sym);
                }
            }
            "decorated_definition" => {
                if let Some(def) = node.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            if let Some(sym) = self.extract_function(&def, node, source, "function")
                            {
                                out.symbols.push(sym);
                            }
                        }
                        "class_definition" => {
                            if let Some(sym) = self.extract_class(&def, node, source, out) {
                                out.symbols.push(sym);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_statement" | "import_from_statement" => {
                self.extract_import(node, source, out);
            }
            "expression_statement" => {
                // Module-level assignment: X = value
                if let Some(sym) = self.extract_assignment(node, source) {
                    out.symbols.push(sym);
                }
            }
            _ => {}
        }
    }

    /// `outer` is the decorated_definition when present, so docstring lookup
    /// sees the comments above the decorators.
    fn extract_function(
        &self,
        node: &Node,
        outer: &Node,
        source: &str,
        kind: &str,
    ) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let docstring = {
            let preceding = doc_comment_before(outer, source);
            if preceding.is_empty() {
                body_docstring(node, source)
            } else {
                preceding
            }
        };
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: kind.to_string(),
            signature: signature_text(node, source, &[':']),
            span: Span::of_node(outer),
            docstring,
            children: Vec::new(),
        })
    }

    fn extract_class(
        &self,
        node: &Node,
        outer: &Node,
        source: &str,
        out: &mut ParsedFile,
    ) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let class_name = engine::node_text(&name_node, source).to_string();

        // Base classes become extends edges
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.children(&mut cursor) {
                if matches!(base.kind(), "identifier" | "attribute") {
                    out.dependencies.push(ParsedDependency::typed(
                        EdgeType::Extends,
                        class_name.clone(),
                        engine::node_text(&base, source),
                    ));
                }
            }
        }

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "function_definition" => {
                        if let Some(sym) = self.extract_function(&child, &child, source, "method") {
                            methods.push(sym);
                        }
                    }
                    "decorated_definition" => {
                        if let Some(def) = child.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                if let Some(sym) =
                                    self.extract_function(&def, &child, source, "method")
                                {
                                    methods.push(sym);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let docstring = {
            let preceding = doc_comment_before(outer, source);
            if preceding.is_empty() {
                body_docstring(node, source)
            } else {
                preceding
            }
        };

        Some(ParsedSymbol {
            name: class_name,
            kind: "class".to_string(),
            signature: signature_text(node, source, &[':']),
            span: Span::of_node(outer),
            docstring,
            children: methods,
        })
    }

    fn extract_assignment(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let mut cursor = node.walk();
        let assignment = node
            .children(&mut cursor)
            .find(|c| c.kind() == "assignment")?;
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        Some(ParsedSymbol {
            name: engine::node_text(&left, source).to_string(),
            kind: "variable".to_string(),
            signature: signature_text(&assignment, source, &['=']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_import(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        match node.kind() {
            "import_statement" => {
                // import a.b, c — one dependency per dotted name
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            self.push_import(engine::node_text(&child, source), out);
                        }
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                self.push_import(engine::node_text(&name, source), out);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|m| engine::node_text(&m, source).to_string())
                    .unwrap_or_default();
                if module.is_empty() {
                    return;
                }
                self.push_import(&module, out);

                // Each imported name is a reference to a symbol of the
                // target module, resolved after mapping.
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let text = engine::node_text(&name, source);
                    if !text.is_empty() && text != "*" {
                        out.dependencies.push(ParsedDependency::typed(
                            EdgeType::Reference,
                            "",
                            text,
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    fn push_import(&self, module: &str, out: &mut ParsedFile) {
        let dep = if module.starts_with('.') {
            // Relative import: repository-local
            ParsedDependency::import(module, false)
        } else {
            let top = module.split('.').next().unwrap_or(module);
            if PYTHON_STDLIB.contains(&top) {
                ParsedDependency::stdlib_import(module)
            } else {
                ParsedDependency::import(module, true)
            }
        };
        out.dependencies.push(dep);
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

        let new_context = if node.kind() == "function_definition" {
            node.child_by_field_name("name")
                .map(|n| engine::node_text(&n, source).to_string())
                .or(current_function.clone())
        } else {
            current_function.clone()
        };

        if node.kind() == "call" {
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
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "identifier" => Some(engine::node_text(&func, source).to_string()),
            // obj.method(): rightmost name
            "attribute" => func
                .child_by_field_name("attribute")
                .map(|a| engine::node_text(&a, source).to_string()),
            _ => Some(engine::node_text(&func, source).to_string()),
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
    fn language_name(&self) -> &str {
        "python"
    }

    fn handles(&self) -> &[Language] {
        &[Language::Python]
    }

    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let tree = engine::parse_source(source, Language::Python)?;
        let mut file = ParsedFile::new(path, language, source);
        if let Some(issue) = engine::advisory_issue(&tree, path) {
            file.errors.push(issue);
        }
        self.extract(tree.root_node(), source, &mut file);
        Ok(file)
    }
}

/// Conventional docstring: the first string expression in a definition body.
fn body_docstring(node: &Node, source: &str) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let Some(first) = body.named_child(0) else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    let Some(expr) = first.named_child(0) else {
        return String::new();
    };
    if expr.kind() != "string" {
        return String::new();
    }
    let text = engine::node_text(&expr, source);
    text.trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
