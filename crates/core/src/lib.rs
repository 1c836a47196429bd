//! CodeAtlas Core — repository parsing and code knowledge graph extraction
//!
//! This crate turns a source tree into a normalized, cross-language graph
//! artifact:
//! - Deterministic repository scanning with language classification
//! - Per-language symbol and dependency extraction via Tree-sitter
//! - Header/implementation pairing for C-family files
//! - Schema mapping with deterministic ids and a canonical JSON artifact

pub mod engine;
pub mod language;
pub mod mapper;
pub mod output;
pub mod pairer;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod scanner;
pub mod schema;

pub use language::Language;
pub use mapper::{map_to_output, normalize_kind, RunTotals};
pub use output::{write, Indent, OutputError, OutputOptions, WriteMode};
pub use pairer::{pair_headers, split_signature, CSignature};
pub use parser::{
    LanguageParser, ParseError, ParsedDependency, ParsedFile, ParsedSymbol, ParserDispatcher,
};
pub use pipeline::{
    parse_repository, parse_repository_to_writer, parse_repository_with_cancel, AtlasError,
    AtlasOptions,
};
pub use pool::ParserPool;
pub use scanner::{scan, ScanFilter, ScannedFile};
pub use schema::{
    DependencyEdge, EdgeType, File, IssueKind, ParseIssue, ParseMetadata, ParseOutput, Span,
    Symbol, SymbolKind,
};

/// CodeAtlas version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
