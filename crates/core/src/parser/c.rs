//! C and C++ language parser using Tree-sitter
//!
//! Uses `tree-sitter-c` for C and `tree-sitter-cpp` for C++ sources. Headers
//! (`.h`) parse as C first; the header/impl pairer re-parses them as C++ or
//! Objective-C when a sibling implementation file warrants it.

use super::docs::{doc_comment_before, signature_text};
use super::{LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol};
use crate::engine;
use crate::language::Language;
use crate::schema::{EdgeType, Span};
use tree_sitter::{Node, TreeCursor};

/// Standard C library headers, including their C++ `cXXX` variants. These are
/// internal to the language: not repository files, not external packages.
const C_STD_HEADERS: &[&str] = &[
    "assert.h",
    "complex.h",
    "ctype.h",
    "errno.h",
    "fenv.h",
    "float.h",
    "inttypes.h",
    "iso646.h",
    "limits.h",
    "locale.h",
    "math.h",
    "setjmp.h",
    "signal.h",
    "stdalign.h",
    "stdarg.h",
    "stdatomic.h",
    "stdbool.h",
    "stddef.h",
    "stdint.h",
    "stdio.h",
    "stdlib.h",
    "stdnoreturn.h",
    "string.h",
    "tgmath.h",
    "threads.h",
    "time.h",
    "uchar.h",
    "wchar.h",
    "wctype.h",
];

/// C++ standard library headers (extension-less) plus the `c`-prefixed libc
/// wrappers.
const CPP_STD_HEADERS: &[&str] = &[
    "algorithm",
    "any",
    "array",
    "atomic",
    "bitset",
    "cassert",
    "cctype",
    "cerrno",
    "cfloat",
    "chrono",
    "cinttypes",
    "climits",
    "cmath",
    "csetjmp",
    "csignal",
    "cstdarg",
    "cstddef",
    "cstdint",
    "cstdio",
    "cstdlib",
    "cstring",
    "ctime",
    "cwchar",
    "cwctype",
    "deque",
    "exception",
    "filesystem",
    "format",
    "fstream",
    "functional",
    "future",
    "initializer_list",
    "iomanip",
    "iostream",
    "istream",
    "iterator",
    "limits",
    "list",
    "map",
    "memory",
    "mutex",
    "new",
    "numeric",
    "optional",
    "ostream",
    "queue",
    "random",
    "ratio",
    "regex",
    "set",
    "span",
    "sstream",
    "stack",
    "stdexcept",
    "string",
    "string_view",
    "thread",
    "tuple",
    "type_traits",
    "typeinfo",
    "unordered_map",
    "unordered_set",
    "utility",
    "variant",
    "vector",
];

/// C and C++ language parser.
pub struct CParser;

impl CParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, root: Node, source: &str, is_cpp: bool, out: &mut ParsedFile) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit_toplevel(&child, source, is_cpp, out);
        }
        self.extract_calls(&root, source, out);
    }

    fn visit_toplevel(&self, node: &Node, source: &str, is_cpp: bool, out: &mut ParsedFile) {
        match node.kind() {
            "function_definition" => {
                if let Some(sym) = self.extract_function(node, source) {
                    out.symbols.push(sym);
                }
            }
            "declaration" => {
                self.extract_declaration(node, source, out);
            }
            "struct_specifier" => {
                if let Some(sym) = self.extract_record(node, source, "struct") {
                    out.symbols.push(sym);
                }
            }
            "union_specifier" => {
                if let Some(sym) = self.extract_record(node, source, "union") {
                    out.symbols.push(sym);
                }
            }
            "enum_specifier" => {
                if let Some(sym) = self.extract_enum(node, source) {
                    out.symbols.push(sym);
                }
            }
            "type_definition" => {
                if let Some(sym) = self.extract_typedef(node, source) {
                    out.symbols.push(sym);
                }
            }
            "preproc_include" => {
                if let Some(dep) = self.extract_include(node, source) {
                    out.dependencies.push(dep);
                }
            }
            "preproc_def" => {
                if let Some(sym) = self.extract_macro(node, source, "macro") {
                    out.symbols.push(sym);
                }
            }
            "preproc_function_def" => {
                if let Some(sym) = self.extract_macro(node, source, "function_macro") {
                    out.symbols.push(sym);
                }
            }
            // Headers wrap everything in include guards; conditional blocks
            // contribute their children at the top level.
            "preproc_ifdef" | "preproc_if" | "preproc_else" | "linkage_specification" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit_toplevel(&child, source, is_cpp, out);
                }
            }
            "namespace_definition" if is_cpp => {
                if let Some(sym) = self.extract_namespace(node, source) {
                    out.symbols.push(sym);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.visit_toplevel(&child, source, is_cpp, out);
                    }
                }
            }
            "class_specifier" if is_cpp => {
                if let Some(sym) = self.extract_class(node, source, out) {
                    out.symbols.push(sym);
                }
            }
            "template_declaration" if is_cpp => {
                // Unwrap the template to extract the inner definition
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if matches!(
                        child.kind(),
                        "function_definition"
                            | "class_specifier"
                            | "struct_specifier"
                            | "declaration"
                    ) {
                        self.visit_toplevel(&child, source, is_cpp, out);
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    /// A function definition or declaration. `kind` is `static_function` when
    /// a `static` storage class is present.
    fn extract_function(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let declarator = node.child_by_field_name("declarator")?;
        let (name, _params) = unwrap_to_function_declarator(declarator, source)?;

        let kind = if has_storage_class(node, source, "static") {
            "static_function"
        } else {
            "function"
        };

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{', ';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    /// A top-level `declaration`: a function prototype or one or more
    /// variable declarators.
    fn extract_declaration(&self, node: &Node, source: &str, out: &mut ParsedFile) {
        // Named struct/union/enum defined inline: `struct Point { ... } p;`.
        // A bare type reference (`struct Point p;`) has no body and defines
        // nothing.
        if let Some(type_node) = node.child_by_field_name("type") {
            if type_node.child_by_field_name("body").is_some() {
                match type_node.kind() {
                    "struct_specifier" => {
                        if let Some(sym) = self.extract_record(&type_node, source, "struct") {
                            out.symbols.push(sym);
                        }
                    }
                    "union_specifier" => {
                        if let Some(sym) = self.extract_record(&type_node, source, "union") {
                            out.symbols.push(sym);
                        }
                    }
                    "enum_specifier" => {
                        if let Some(sym) = self.extract_enum(&type_node, source) {
                            out.symbols.push(sym);
                        }
                    }
                    _ => {}
                }
            }
        }

        let is_extern = has_storage_class(node, source, "extern");
        let is_static = has_storage_class(node, source, "static");

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "function_declarator" | "pointer_declarator" | "reference_declarator" => {
                    // Function prototype (possibly returning a pointer)
                    if let Some((name, _)) = unwrap_to_function_declarator(child, source) {
                        out.symbols.push(ParsedSymbol {
                            name,
                            kind: if is_static { "static_function" } else { "function" }
                                .to_string(),
                            signature: signature_text(node, source, &['{', ';']),
                            span: Span::of_node(node),
                            docstring: doc_comment_before(node, source),
                            children: Vec::new(),
                        });
                    } else if let Some(name) = declarator_name(&child, source) {
                        out.symbols.push(self.variable_symbol(node, source, name, is_extern));
                    }
                }
                "init_declarator" => {
                    let declarator = child.child_by_field_name("declarator");
                    if let Some(name) = declarator.and_then(|d| declarator_name(&d, source)) {
                        out.symbols.push(self.variable_symbol(node, source, name, is_extern));
                    }
                }
                "identifier" | "array_declarator" => {
                    if let Some(name) = declarator_name(&child, source) {
                        out.symbols.push(self.variable_symbol(node, source, name, is_extern));
                    }
                }
                _ => {}
            }
        }
    }

    fn variable_symbol(
        &self,
        node: &Node,
        source: &str,
        name: String,
        is_extern: bool,
    ) -> ParsedSymbol {
        ParsedSymbol {
            name,
            kind: if is_extern {
                "extern_variable"
            } else {
                "global_variable"
            }
            .to_string(),
            signature: signature_text(node, source, &['=', ';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        }
    }

    fn extract_record(&self, node: &Node, source: &str, kind: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();

        let mut fields = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                if child.kind() == "field_declaration" {
                    let mut fc = child.walk();
                    for fc_child in child.children(&mut fc) {
                        if fc_child.kind() == "field_identifier" {
                            fields.push(ParsedSymbol {
                                name: engine::node_text(&fc_child, source).to_string(),
                                kind: "field".to_string(),
                                signature: signature_text(&child, source, &[';']),
                                span: Span::of_node(&child),
                                docstring: String::new(),
                                children: Vec::new(),
                            });
                        }
                    }
                }
            }
        }

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: fields,
        })
    }

    fn extract_enum(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();

        let mut constants = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                if child.kind() == "enumerator" {
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

    fn extract_typedef(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        // The declarator carries the new type name; it may be nested under
        // pointer or function declarators (function-pointer typedefs).
        let declarator = node.child_by_field_name("declarator")?;
        let name = typedef_name(&declarator, source)?;

        Some(ParsedSymbol {
            name,
            kind: "typedef".to_string(),
            signature: signature_text(node, source, &[';']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_macro(&self, node: &Node, source: &str, kind: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = engine::node_text(&name_node, source).to_string();

        // Macro "signature" is the #define line itself
        let first_line = engine::node_text(node, source)
            .lines()
            .next()
            .unwrap_or_default()
            .trim_end_matches('\\')
            .trim()
            .to_string();

        Some(ParsedSymbol {
            name,
            kind: kind.to_string(),
            signature: first_line,
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_namespace(&self, node: &Node, source: &str) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        Some(ParsedSymbol {
            name: engine::node_text(&name_node, source).to_string(),
            kind: "namespace".to_string(),
            signature: signature_text(node, source, &['{']),
            span: Span::of_node(node),
            docstring: doc_comment_before(node, source),
            children: Vec::new(),
        })
    }

    fn extract_class(&self, node: &Node, source: &str, out: &mut ParsedFile) -> Option<ParsedSymbol> {
        let name_node = node.child_by_field_name("name")?;
        let class_name = engine::node_text(&name_node, source).to_string();

        // First base is the superclass; further bases in a multiple
        // inheritance list are treated as implemented interfaces.
        for (i, base) in base_class_names(node, source).into_iter().enumerate() {
            let edge = if i == 0 {
                EdgeType::Extends
            } else {
                EdgeType::Implements
            };
            out.dependencies
                .push(ParsedDependency::typed(edge, class_name.clone(), base));
        }

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "function_definition" => {
                        if let Some(mut sym) = self.extract_function(&child, source) {
                            sym.kind = "method".to_string();
                            members.push(sym);
                        }
                    }
                    "field_declaration" => {
                        // Method declaration or data member
                        if let Some(declarator) = child.child_by_field_name("declarator") {
                            if let Some((name, _)) =
                                unwrap_to_function_declarator(declarator, source)
                            {
                                members.push(ParsedSymbol {
                                    name,
                                    kind: "method".to_string(),
                                    signature: signature_text(&child, source, &['{', ';']),
                                    span: Span::of_node(&child),
                                    docstring: doc_comment_before(&child, source),
                                    children: Vec::new(),
                                });
                                continue;
                            }
                            if let Some(name) = declarator_name(&declarator, source) {
                                members.push(ParsedSymbol {
                                    name,
                                    kind: "field".to_string(),
                                    signature: signature_text(&child, source, &['=', ';']),
                                    span: Span::of_node(&child),
                                    docstring: String::new(),
                                    children: Vec::new(),
                                });
                            }
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

    fn extract_include(&self, node: &Node, source: &str) -> Option<ParsedDependency> {
        let path_node = node.child_by_field_name("path")?;
        let raw = engine::node_text(&path_node, source);
        let is_system = path_node.kind() == "system_lib_string";
        let include_path = raw
            .trim_matches('"')
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string();

        if is_system {
            if C_STD_HEADERS.contains(&include_path.as_str())
                || CPP_STD_HEADERS.contains(&include_path.as_str())
            {
                // Language-internal: libc / C++ standard library
                Some(ParsedDependency::stdlib_import(include_path))
            } else {
                // POSIX / OS / third-party system header
                Some(ParsedDependency::import(include_path, true))
            }
        } else {
            // Quoted include: repository-local, resolved by the pairer/mapper
            Some(ParsedDependency::import(include_path, false))
        }
    }

    /// Second pass: call edges. The caller is the innermost enclosing
    /// function definition; calls outside any function are skipped.
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
            node.child_by_field_name("declarator")
                .and_then(|d| unwrap_to_function_declarator(d, source))
                .map(|(name, _)| name)
                .or(current_function.clone())
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
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "identifier" => Some(engine::node_text(&func, source).to_string()),
            // obj.method() / obj->method(): rightmost name
            "field_expression" => func
                .child_by_field_name("field")
                .map(|f| engine::node_text(&f, source).to_string()),
            "qualified_identifier" => Some(engine::node_text(&func, source).to_string()),
            // Function-pointer and other expression calls keep verbatim text
            _ => Some(engine::node_text(&func, source).to_string()),
        }
    }
}

impl Default for CParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for CParser {
    fn language_name(&self) -> &str {
        "c/cpp"
    }

    fn handles(&self) -> &[Language] {
        &[Language::C, Language::Cpp]
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
        self.extract(tree.root_node(), source, language == Language::Cpp, &mut file);
        Ok(file)
    }
}

/// Iteratively unwrap pointer/reference declarator layers until a
/// `function_declarator` is found. Returns `(function_name, parameter_list)`.
fn unwrap_to_function_declarator<'a>(
    mut node: Node<'a>,
    source: &str,
) -> Option<(String, Node<'a>)> {
    loop {
        match node.kind() {
            "function_declarator" => {
                let name_node = node.child_by_field_name("declarator")?;
                let name = declarator_name(&name_node, source)?;
                let params = node.child_by_field_name("parameters")?;
                return Some((name, params));
            }
            "pointer_declarator" | "reference_declarator" => {
                node = node.child_by_field_name("declarator")?;
            }
            _ => return None,
        }
    }
}

/// Innermost identifier of a (possibly pointer/array) declarator.
fn declarator_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "operator_name" => {
            Some(engine::node_text(node, source).to_string())
        }
        "pointer_declarator" | "reference_declarator" | "array_declarator"
        | "parenthesized_declarator" | "function_declarator" | "init_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            declarator_name(&inner, source)
        }
        "qualified_identifier" => Some(engine::node_text(node, source).to_string()),
        _ => None,
    }
}

/// Name introduced by a typedef declarator (handles function-pointer forms).
fn typedef_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" => Some(engine::node_text(node, source).to_string()),
        "pointer_declarator" | "function_declarator" | "array_declarator"
        | "parenthesized_declarator" => {
            // Search children for the nested type_identifier
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(name) = typedef_name(&child, source) {
                    return Some(name);
                }
            }
            None
        }
        _ => None,
    }
}

/// Type names in a `base_class_clause`, in declaration order.
fn base_class_names(node: &Node, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "base_class_clause" {
            continue;
        }
        let mut bc = child.walk();
        for base in child.children(&mut bc) {
            if matches!(base.kind(), "type_identifier" | "qualified_identifier") {
                bases.push(engine::node_text(&base, source).to_string());
            }
        }
    }
    bases
}

fn has_storage_class(node: &Node, source: &str, which: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|child| {
        child.kind() == "storage_class_specifier" && engine::node_text(&child, source) == which
    });
    result
}
