//! Thin facade over tree-sitter
//!
//! Grammar registry, parsing with advisory error reporting, and query
//! execution. Grammar tables are immutable and shared; a `Parser` is created
//! per parse call, so workers never share mutable tree-sitter state.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

use crate::language::Language;
use crate::parser::ParseError;
use crate::schema::{IssueKind, ParseIssue};

/// Grammar for a language in the closed set.
pub fn grammar_for(language: Language) -> tree_sitter::Language {
    match language {
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::ObjC => tree_sitter_objc::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
        Language::Swift => tree_sitter_swift::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
    }
}

/// Parse source text. A tree is returned whenever tree-sitter consumed any
/// input, even if the grammar reported errors; use [`advisory_issue`] to
/// surface those without discarding the partial tree.
pub fn parse_source(source: &str, language: Language) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(language))
        .map_err(|e| ParseError::TreeSitter(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParseError::ParseFailed(format!("failed to parse {language} source")))
}

/// Advisory syntax-error record for a tree, if the grammar flagged one.
/// Points at the first ERROR or missing node.
pub fn advisory_issue(tree: &Tree, path: &str) -> Option<ParseIssue> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    let issue = ParseIssue::new(path, IssueKind::Parse, "syntax error; partial tree retained");
    match first_error_node(root) {
        Some(node) => {
            let pos = node.start_position();
            Some(issue.at(pos.row as u32 + 1, pos.column as u32 + 1))
        }
        None => Some(issue),
    }
}

fn first_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error_node(child) {
                return Some(found);
            }
        }
    }
    None
}

/// One capture of a query match. `index` follows the textual order of the
/// `@name` markers in the pattern.
#[derive(Debug, Clone)]
pub struct QueryCapture<'tree> {
    pub index: u32,
    pub name: String,
    pub node: Node<'tree>,
}

/// Run a query pattern over a subtree, returning each match's captures.
pub fn query_matches<'tree>(
    root: Node<'tree>,
    pattern: &str,
    language: Language,
    source: &str,
) -> Result<Vec<Vec<QueryCapture<'tree>>>, ParseError> {
    let query = Query::new(&grammar_for(language), pattern)
        .map_err(|e| ParseError::Query(e.to_string()))?;
    let names = query.capture_names();

    let mut cursor = QueryCursor::new();
    let mut it = cursor.matches(&query, root, source.as_bytes());

    let mut matches = Vec::new();
    while let Some(m) = it.next() {
        let captures = m
            .captures
            .iter()
            .map(|c| QueryCapture {
                index: c.index,
                name: names[c.index as usize].to_string(),
                node: c.node,
            })
            .collect();
        matches.push(captures);
    }
    Ok(matches)
}

/// Text of a node within its source buffer.
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}
