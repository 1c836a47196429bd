//! Language parsers extracting symbols and dependency facts from source files

pub mod c;
pub mod docs;
pub mod go;
pub mod java;
pub mod kotlin;
pub mod objc;
pub mod python;
pub mod swift;
pub mod typescript;

use std::collections::BTreeMap;
use thiserror::Error;

use crate::language::Language;
use crate::schema::{EdgeType, ParseIssue, Span};

/// Error types for parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse file: {0}")]
    ParseFailed(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("query error: {0}")]
    Query(String),
}

/// A symbol extracted by a language parser, before schema normalization.
///
/// `kind` is a parser-level string (`"static_function"`, `"enum_constant"`,
/// …); the mapper collapses it into the closed schema set. Nested members
/// (struct fields, enum constants, class methods) hang off `children`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSymbol {
    pub name: String,
    pub kind: String,
    pub signature: String,
    pub span: Span,
    pub docstring: String,
    pub children: Vec<ParsedSymbol>,
}

/// A dependency fact recorded during parsing, before cross-file resolution.
///
/// `source` is the caller/subject symbol name (empty for file-level facts
/// such as imports). `target` is the callee/type/declaration name; for plain
/// imports it is empty and `target_module` carries the raw specifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDependency {
    pub edge_type: EdgeType,
    pub source: String,
    pub target: String,
    pub target_module: String,
    pub is_external: bool,
    /// Language-internal (libc, Python stdlib, Go stdlib): neither external
    /// nor resolvable to a repository file.
    pub is_stdlib: bool,
}

impl ParsedDependency {
    pub fn import(module: impl Into<String>, is_external: bool) -> Self {
        Self {
            edge_type: EdgeType::Import,
            source: String::new(),
            target: String::new(),
            target_module: module.into(),
            is_external,
            is_stdlib: false,
        }
    }

    pub fn stdlib_import(module: impl Into<String>) -> Self {
        Self {
            is_stdlib: true,
            ..Self::import(module, false)
        }
    }

    pub fn call(caller: impl Into<String>, callee: impl Into<String>) -> Self {
        Self {
            edge_type: EdgeType::Call,
            source: caller.into(),
            target: callee.into(),
            target_module: String::new(),
            is_external: false,
            is_stdlib: false,
        }
    }

    pub fn typed(
        edge_type: EdgeType,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            edge_type,
            source: source.into(),
            target: target.into(),
            target_module: String::new(),
            is_external: false,
            is_stdlib: false,
        }
    }
}

/// An optional concrete-syntax-tree node record a parser may emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedNode {
    pub node_type: String,
    pub span: Span,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

/// Per-file parse result. Lives only for the duration of one pipeline run;
/// the mapper consumes it and drops the content buffer.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Repo-relative path with forward slashes
    pub path: String,
    pub language: Language,
    /// Source text; also the checksum input
    pub source: String,
    pub symbols: Vec<ParsedSymbol>,
    pub dependencies: Vec<ParsedDependency>,
    pub nodes: Vec<ParsedNode>,
    /// Non-fatal extraction faults local to this file
    pub errors: Vec<ParseIssue>,
}

impl ParsedFile {
    pub fn new(path: impl Into<String>, language: Language, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            source: source.into(),
            symbols: Vec::new(),
            dependencies: Vec::new(),
            nodes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Names of all symbols defined at any nesting depth in this file.
    pub fn symbol_names(&self) -> Vec<&str> {
        fn walk<'a>(symbols: &'a [ParsedSymbol], out: &mut Vec<&'a str>) {
            for s in symbols {
                out.push(s.name.as_str());
                walk(&s.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.symbols, &mut out);
        out
    }
}

/// Trait for language-specific parsers
///
/// Each parser converts source text into a [`ParsedFile`]. Extraction
/// failures inside a file are recorded in the file's error list; the parser
/// still returns the best partial result it has.
pub trait LanguageParser: Send + Sync {
    /// Name of the language (family) this parser handles
    fn language_name(&self) -> &str;

    /// Languages this parser accepts
    fn handles(&self) -> &[Language];

    /// Parse source text into symbols and dependency facts
    fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError>;
}

/// Dispatcher that routes files to the appropriate language parser
pub struct ParserDispatcher {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserDispatcher {
    /// Create a new parser dispatcher with default parsers
    pub fn new() -> Self {
        Self::with_project_package(None)
    }

    /// Create a dispatcher whose Java/Kotlin parsers treat imports under
    /// `project_package` as repository-local.
    pub fn with_project_package(project_package: Option<String>) -> Self {
        Self {
            parsers: vec![
                Box::new(c::CParser::new()),
                Box::new(go::GoParser::new()),
                Box::new(java::JavaParser::new(project_package.clone())),
                Box::new(kotlin::KotlinParser::new(project_package)),
                Box::new(objc::ObjCParser::new()),
                Box::new(python::PythonParser::new()),
                Box::new(swift::SwiftParser::new()),
                Box::new(typescript::TypeScriptParser::new()),
            ],
        }
    }

    /// Create a dispatcher with custom parsers
    pub fn with_parsers(parsers: Vec<Box<dyn LanguageParser>>) -> Self {
        Self { parsers }
    }

    /// Find a parser for the given language
    pub fn find_parser(&self, language: Language) -> Option<&dyn LanguageParser> {
        self.parsers
            .iter()
            .find(|parser| parser.handles().contains(&language))
            .map(|boxed| &**boxed)
    }

    /// Parse source text with the parser registered for `language`.
    pub fn parse_source(
        &self,
        path: &str,
        language: Language,
        source: &str,
    ) -> Result<ParsedFile, ParseError> {
        let parser = self
            .find_parser(language)
            .ok_or_else(|| ParseError::UnsupportedLanguage(language.to_string()))?;
        parser.parse_source(path, language, source)
    }
}

impl Default for ParserDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
