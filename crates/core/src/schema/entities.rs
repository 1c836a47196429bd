//! Canonical schema entities for the parse artifact

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A half-open byte range plus inclusive 1-indexed line range.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    /// Span of a tree-sitter node (rows are 0-indexed in tree-sitter).
    pub fn of_node(node: &tree_sitter::Node) -> Self {
        Self {
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Span covering an entire source buffer.
    pub fn of_source(source: &str) -> Self {
        let lines = source.lines().count().max(1) as u32;
        Self {
            start_line: 1,
            end_line: lines,
            start_byte: 0,
            end_byte: source.len(),
        }
    }
}

/// Normalized symbol kinds. Parsers report free-form kind strings; the
/// mapper collapses them into this closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Struct,
    Enum,
    Variable,
    Module,
    Package,
    Field,
    Constant,
    Typedef,
    Macro,
}

/// Edge kinds of the dependency graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Import,
    Call,
    Reference,
    Extends,
    Implements,
    ImplementsDeclaration,
    ImplementsHeader,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Import => "import",
            EdgeType::Call => "call",
            EdgeType::Reference => "reference",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
            EdgeType::ImplementsDeclaration => "implements_declaration",
            EdgeType::ImplementsHeader => "implements_header",
        }
    }
}

/// A source file in the artifact, owning its symbols and optional AST nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct File {
    pub file_id: String,
    pub path: String,
    pub language: String,
    pub size: usize,
    pub checksum: String,
    pub symbols: Vec<Symbol>,
    pub nodes: Vec<AstNode>,
}

/// A named code entity extracted from a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    pub symbol_id: String,
    pub file_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub span: Span,
    pub docstring: String,
    pub semantic_summary: String,
}

/// An optional concrete-syntax-tree node record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AstNode {
    pub node_id: String,
    pub file_id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub span: Span,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

/// A typed relationship between two entities of the artifact.
///
/// `target_id` may be empty only for `import` edges whose specifier could not
/// be resolved inside the repository; `target_module` carries the raw
/// specifier in that case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyEdge {
    pub edge_id: String,
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub source_file: String,
    pub target_file: String,
    pub target_module: String,
}

/// Closed error categories of the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Filesystem,
    Parse,
    Mapping,
    Output,
}

/// A per-file fault recorded during scanning, parsing, or mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseIssue {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
}

impl ParseIssue {
    pub fn new(file: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            message: message.into(),
            kind,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Run-level metadata attached to the artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseMetadata {
    pub version: String,
    pub timestamp: String,
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<ParseIssue>,
}

/// The serialized artifact: all files, all relationships, and run metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseOutput {
    pub files: Vec<File>,
    pub relationships: Vec<DependencyEdge>,
    pub metadata: ParseMetadata,
}

/// Schema version stamped into `metadata.version`.
pub const SCHEMA_VERSION: &str = "1.0.0";
