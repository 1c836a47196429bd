//! The language-agnostic graph schema emitted by the pipeline

pub mod entities;
pub mod ids;

pub use entities::{
    AstNode, DependencyEdge, EdgeType, File, IssueKind, ParseIssue, ParseMetadata, ParseOutput,
    Span, Symbol, SymbolKind, SCHEMA_VERSION,
};
pub use ids::{edge_id, external_file_id, file_id, symbol_id, EXTERNAL_FILE_PATH};
