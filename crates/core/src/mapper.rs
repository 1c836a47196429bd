//! Schema mapping: `ParsedFile` trees into the canonical artifact
//!
//! Deterministic id assignment, kind normalization, checksums, external
//! symbol synthesis, import wiring, validation, and the canonical sort. Runs
//! single-threaded after the pool completes; determinism comes from the ids
//! plus the final sort, not from pipeline ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::parser::{ParsedDependency, ParsedFile, ParsedNode, ParsedSymbol};
use crate::schema::{
    self, AstNode, DependencyEdge, EdgeType, File, IssueKind, ParseIssue, ParseMetadata,
    ParseOutput, Span, Symbol, SymbolKind, EXTERNAL_FILE_PATH, SCHEMA_VERSION,
};

/// Run totals reported by the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTotals {
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Collapse a parser-level kind string into the closed schema set.
pub fn normalize_kind(kind: &str) -> SymbolKind {
    match kind {
        "function" | "static_function" => SymbolKind::Function,
        "method" => SymbolKind::Method,
        "class" | "implementation" | "extension" => SymbolKind::Class,
        "interface" | "protocol" => SymbolKind::Interface,
        "struct" | "union" => SymbolKind::Struct,
        "enum" => SymbolKind::Enum,
        "variable" | "global_variable" | "extern_variable" | "property" | "var" => {
            SymbolKind::Variable
        }
        "module" | "namespace" => SymbolKind::Module,
        "package" => SymbolKind::Package,
        "field" => SymbolKind::Field,
        "constant" | "const" | "enum_constant" => SymbolKind::Constant,
        "typedef" | "type" | "type_alias" => SymbolKind::Typedef,
        "macro" | "function_macro" => SymbolKind::Macro,
        _ => SymbolKind::Variable,
    }
}

/// Map parsed files into a validated, canonically sorted [`ParseOutput`].
///
/// `issues` carries scan/pool/pairer faults to merge into the metadata;
/// `timestamp` is injectable so identical trees serialize byte-identically.
pub fn map_to_output(
    parsed_files: Vec<ParsedFile>,
    issues: Vec<ParseIssue>,
    totals: RunTotals,
    timestamp: DateTime<Utc>,
) -> ParseOutput {
    Mapper::default().run(parsed_files, issues, totals, timestamp)
}

#[derive(Default)]
struct Mapper {
    /// Normalized external specifier → synthesized module symbol
    external_symbols: BTreeMap<String, Symbol>,
    errors: Vec<ParseIssue>,
}

impl Mapper {
    fn run(
        mut self,
        mut parsed_files: Vec<ParsedFile>,
        issues: Vec<ParseIssue>,
        totals: RunTotals,
        timestamp: DateTime<Utc>,
    ) -> ParseOutput {
        self.errors = issues;

        // Order-independence: normalize input order before id-free work
        parsed_files.sort_by(|a, b| a.path.cmp(&b.path));

        // ── Files and symbols ────────────────────────────────────────────
        let mut files: Vec<File> = Vec::with_capacity(parsed_files.len() + 1);
        // path → (file_id, module_symbol_id)
        let mut file_index: HashMap<String, (String, String)> = HashMap::new();
        // per path: symbol name → symbol_id (first occurrence wins)
        let mut symbols_by_file: HashMap<String, HashMap<String, String>> = HashMap::new();

        for parsed in &mut parsed_files {
            let file = self.map_file(parsed, &mut symbols_by_file);
            file_index.insert(
                file.path.clone(),
                (file.file_id.clone(), file.symbols[0].symbol_id.clone()),
            );
            self.errors.append(&mut parsed.errors);
            files.push(file);
        }

        // Global symbol name → (path, symbol_id); files are path-sorted so
        // the first match is deterministic.
        let mut global_symbols: HashMap<&str, (&str, &str)> = HashMap::new();
        for file in &files {
            for sym in &file.symbols {
                // Module and package symbols are import targets, not
                // call/extends targets.
                if matches!(sym.kind, SymbolKind::Module | SymbolKind::Package) {
                    continue;
                }
                global_symbols
                    .entry(sym.name.as_str())
                    .or_insert((file.path.as_str(), sym.symbol_id.as_str()));
            }
        }

        // ── Edges ────────────────────────────────────────────────────────
        let mut edges: Vec<DependencyEdge> = Vec::new();
        let mut seen_edges: HashSet<String> = HashSet::new();
        for parsed in &parsed_files {
            for dep in &parsed.dependencies {
                if let Some(edge) = self.map_dependency(
                    dep,
                    &parsed.path,
                    &file_index,
                    &symbols_by_file,
                    &global_symbols,
                ) {
                    if seen_edges.insert(edge.edge_id.clone()) {
                        edges.push(edge);
                    }
                }
            }
        }

        // Content buffers are released here; only schema entities survive.
        drop(parsed_files);

        // ── External pseudo-file ─────────────────────────────────────────
        if !self.external_symbols.is_empty() {
            let ext_symbols: Vec<Symbol> =
                std::mem::take(&mut self.external_symbols).into_values().collect();
            files.push(File {
                file_id: schema::external_file_id(),
                path: EXTERNAL_FILE_PATH.to_string(),
                language: "external".to_string(),
                size: 0,
                checksum: "external".to_string(),
                symbols: ext_symbols,
                nodes: Vec::new(),
            });
        }

        // ── Validation ───────────────────────────────────────────────────
        self.validate(&mut files, &mut edges);

        // ── Canonical sort ───────────────────────────────────────────────
        files.sort_by(|a, b| a.path.cmp(&b.path));
        edges.sort_by(|a, b| {
            let ka = (&a.source_id, a.edge_type.as_str(), edge_target_key(a));
            let kb = (&b.source_id, b.edge_type.as_str(), edge_target_key(b));
            ka.cmp(&kb)
        });

        // Pool issues arrive in completion order; sort for determinism.
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by(|a, b| {
            (&a.file, a.line, &a.message).cmp(&(&b.file, b.line, &b.message))
        });
        ParseOutput {
            files,
            relationships: edges,
            metadata: ParseMetadata {
                version: SCHEMA_VERSION.to_string(),
                timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                total_files: totals.total_files,
                success_count: totals.success_count,
                failure_count: totals.failure_count,
                errors,
            },
        }
    }

    fn map_file(
        &mut self,
        parsed: &ParsedFile,
        symbols_by_file: &mut HashMap<String, HashMap<String, String>>,
    ) -> File {
        let file_id = schema::file_id(&parsed.path);
        let checksum = hex_sha256(parsed.source.as_bytes());
        let name_index = symbols_by_file.entry(parsed.path.clone()).or_default();

        // Every file owns a synthetic module symbol spanning the whole file;
        // import and implements_header edges attach to it.
        let module_name = file_stem(&parsed.path);
        let module_span = Span::of_source(&parsed.source);
        let module_symbol = Symbol {
            symbol_id: schema::symbol_id(&file_id, &module_name, 1, 0),
            file_id: file_id.clone(),
            name: module_name,
            kind: SymbolKind::Module,
            signature: String::new(),
            span: module_span,
            docstring: String::new(),
            semantic_summary: String::new(),
        };

        let mut symbols = vec![module_symbol];
        for parsed_symbol in &parsed.symbols {
            self.push_symbol(parsed_symbol, &file_id, &mut symbols, name_index);
        }

        let nodes = parsed
            .nodes
            .iter()
            .map(|n| self.map_node(n, &file_id))
            .collect();

        File {
            file_id,
            path: parsed.path.clone(),
            language: parsed.language.as_str().to_string(),
            size: parsed.source.len(),
            checksum,
            symbols,
            nodes,
        }
    }

    /// Flatten a parsed symbol and its children into the file's symbol list.
    fn push_symbol(
        &mut self,
        parsed: &ParsedSymbol,
        file_id: &str,
        symbols: &mut Vec<Symbol>,
        name_index: &mut HashMap<String, String>,
    ) {
        let symbol_id = schema::symbol_id(
            file_id,
            &parsed.name,
            parsed.span.start_line,
            parsed.span.start_byte,
        );
        // Package symbols share their name with real definitions (Go's
        // `package main` vs `func main`) and must not shadow them.
        if parsed.kind != "package" {
            name_index
                .entry(parsed.name.clone())
                .or_insert_with(|| symbol_id.clone());
        }
        symbols.push(Symbol {
            symbol_id,
            file_id: file_id.to_string(),
            name: parsed.name.clone(),
            kind: normalize_kind(&parsed.kind),
            signature: parsed.signature.clone(),
            span: parsed.span,
            docstring: parsed.docstring.clone(),
            semantic_summary: String::new(),
        });
        for child in &parsed.children {
            self.push_symbol(child, file_id, symbols, name_index);
        }
    }

    fn map_node(&self, parsed: &ParsedNode, file_id: &str) -> AstNode {
        let node_id = schema::symbol_id(
            file_id,
            &parsed.node_type,
            parsed.span.start_line,
            parsed.span.start_byte,
        );
        AstNode {
            node_id,
            file_id: file_id.to_string(),
            node_type: parsed.node_type.clone(),
            parent_id: None,
            span: parsed.span,
            text: parsed.text.clone(),
            attributes: parsed.attributes.clone(),
        }
    }

    fn map_dependency(
        &mut self,
        dep: &ParsedDependency,
        source_path: &str,
        file_index: &HashMap<String, (String, String)>,
        symbols_by_file: &HashMap<String, HashMap<String, String>>,
        global_symbols: &HashMap<&str, (&str, &str)>,
    ) -> Option<DependencyEdge> {
        let (_, module_symbol_id) = file_index.get(source_path)?;
        let own_symbols = symbols_by_file.get(source_path);

        let source_id = if dep.source.is_empty() {
            module_symbol_id.clone()
        } else {
            own_symbols
                .and_then(|index| index.get(base_name(&dep.source)))
                .cloned()
                .unwrap_or_else(|| module_symbol_id.clone())
        };

        match dep.edge_type {
            EdgeType::Import => {
                self.map_import(dep, source_path, &source_id, file_index)
            }
            EdgeType::ImplementsHeader => {
                let (_, header_module_id) = file_index.get(&dep.target_module)?;
                Some(self.edge(
                    source_id,
                    header_module_id.clone(),
                    EdgeType::ImplementsHeader,
                    source_path,
                    dep.target_module.clone(),
                    String::new(),
                ))
            }
            EdgeType::ImplementsDeclaration => {
                let header_symbols = symbols_by_file.get(&dep.target_module)?;
                let target_id = header_symbols.get(base_name(&dep.target))?;
                Some(self.edge(
                    source_id,
                    target_id.clone(),
                    EdgeType::ImplementsDeclaration,
                    source_path,
                    dep.target_module.clone(),
                    String::new(),
                ))
            }
            EdgeType::Call | EdgeType::Reference | EdgeType::Extends | EdgeType::Implements => {
                let target = base_name(&dep.target);
                if target.is_empty() {
                    return None;
                }
                // Same file, then any file, then an external synthesis
                if let Some(target_id) = own_symbols.and_then(|index| index.get(target)) {
                    return Some(self.edge(
                        source_id,
                        target_id.clone(),
                        dep.edge_type,
                        source_path,
                        source_path.to_string(),
                        String::new(),
                    ));
                }
                if let Some((path, target_id)) = global_symbols.get(target) {
                    return Some(self.edge(
                        source_id,
                        (*target_id).to_string(),
                        dep.edge_type,
                        source_path,
                        (*path).to_string(),
                        String::new(),
                    ));
                }
                let kind = match dep.edge_type {
                    EdgeType::Extends => SymbolKind::Class,
                    EdgeType::Implements => SymbolKind::Interface,
                    _ => SymbolKind::Function,
                };
                let target_id = self.external_symbol(target, kind);
                Some(self.edge(
                    source_id,
                    target_id,
                    dep.edge_type,
                    source_path,
                    String::new(),
                    String::new(),
                ))
            }
            _ => None,
        }
    }

    fn map_import(
        &mut self,
        dep: &ParsedDependency,
        source_path: &str,
        source_id: &str,
        file_index: &HashMap<String, (String, String)>,
    ) -> Option<DependencyEdge> {
        let specifier = dep.target_module.trim();
        if specifier.is_empty() {
            return None;
        }

        if dep.is_external {
            let normalized = normalize_specifier(specifier);
            let target_id = self.external_symbol(&normalized, SymbolKind::Module);
            return Some(self.edge(
                source_id.to_string(),
                target_id,
                EdgeType::Import,
                source_path,
                String::new(),
                specifier.to_string(),
            ));
        }

        if dep.is_stdlib {
            debug!(specifier, from = source_path, "stdlib-internal import");
            return Some(self.edge(
                source_id.to_string(),
                String::new(),
                EdgeType::Import,
                source_path,
                String::new(),
                specifier.to_string(),
            ));
        }

        // Repository-local: resolve against the importing file's directory
        if let Some(target_path) = resolve_local(specifier, source_path, file_index) {
            let (_, target_module_id) = &file_index[&target_path];
            return Some(self.edge(
                source_id.to_string(),
                target_module_id.clone(),
                EdgeType::Import,
                source_path,
                target_path.clone(),
                specifier.to_string(),
            ));
        }

        self.errors.push(ParseIssue::new(
            source_path,
            IssueKind::Mapping,
            format!("unresolved local import: {specifier}"),
        ));
        Some(self.edge(
            source_id.to_string(),
            String::new(),
            EdgeType::Import,
            source_path,
            String::new(),
            specifier.to_string(),
        ))
    }

    fn edge(
        &self,
        source_id: String,
        target_id: String,
        edge_type: EdgeType,
        source_file: &str,
        target_file: String,
        target_module: String,
    ) -> DependencyEdge {
        let target_key = if target_id.is_empty() {
            target_module.clone()
        } else {
            target_id.clone()
        };
        DependencyEdge {
            edge_id: schema::edge_id(&source_id, &target_key, edge_type.as_str()),
            source_id,
            target_id,
            edge_type,
            source_file: source_file.to_string(),
            target_file,
            target_module,
        }
    }

    /// Deduplicating external-symbol synthesis; all external symbols live in
    /// the `__external__` pseudo-file.
    fn external_symbol(&mut self, name: &str, kind: SymbolKind) -> String {
        let external_id = schema::external_file_id();
        let symbol = self.external_symbols.entry(name.to_string()).or_insert_with(|| {
            let symbol_id = schema::symbol_id(&external_id, name, 1, 0);
            Symbol {
                symbol_id,
                file_id: external_id.clone(),
                name: name.to_string(),
                kind,
                signature: String::new(),
                span: Span {
                    start_line: 1,
                    end_line: 1,
                    start_byte: 0,
                    end_byte: 0,
                },
                docstring: String::new(),
                semantic_summary: String::new(),
            }
        });
        symbol.symbol_id.clone()
    }

    /// Enforce the schema invariants, dropping offending entities.
    fn validate(&mut self, files: &mut [File], edges: &mut Vec<DependencyEdge>) {
        for file in files.iter_mut() {
            let size = file.size;
            let path = file.path.clone();
            let mut dropped = Vec::new();
            file.symbols.retain(|sym| {
                let ok = sym.span.start_line >= 1
                    && sym.span.end_line >= sym.span.start_line
                    && sym.span.start_byte <= sym.span.end_byte
                    && (sym.span.end_byte <= size || path == EXTERNAL_FILE_PATH);
                if !ok {
                    dropped.push(sym.name.clone());
                }
                ok
            });
            for name in dropped {
                self.errors.push(ParseIssue::new(
                    path.clone(),
                    IssueKind::Mapping,
                    format!("symbol {name} has a span outside the file; dropped"),
                ));
            }
        }

        let known_symbols: HashSet<&str> = files
            .iter()
            .flat_map(|f| f.symbols.iter().map(|s| s.symbol_id.as_str()))
            .collect();

        let mut edge_errors = Vec::new();
        edges.retain(|edge| {
            let ok = match edge.edge_type {
                EdgeType::Import => {
                    (!edge.target_id.is_empty() || !edge.target_module.is_empty())
                        && (edge.target_id.is_empty()
                            || known_symbols.contains(edge.target_id.as_str()))
                }
                _ => {
                    !edge.target_id.is_empty()
                        && known_symbols.contains(edge.target_id.as_str())
                        && known_symbols.contains(edge.source_id.as_str())
                }
            };
            if !ok {
                edge_errors.push(ParseIssue::new(
                    edge.source_file.clone(),
                    IssueKind::Mapping,
                    format!("{} edge failed validation; dropped", edge.edge_type.as_str()),
                ));
            }
            ok
        });
        self.errors.extend(edge_errors);
    }
}

fn edge_target_key(edge: &DependencyEdge) -> &str {
    if edge.target_id.is_empty() {
        &edge.target_module
    } else {
        &edge.target_id
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn file_stem(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(pos) if pos > 0 => file[..pos].to_string(),
        _ => file.to_string(),
    }
}

/// Rightmost segment of a qualified name (`Class::method`, `Class.method`).
fn base_name(name: &str) -> &str {
    name.rsplit("::")
        .next()
        .unwrap_or(name)
        .rsplit('.')
        .next()
        .unwrap_or(name)
}

/// Lowercase the scheme of URL-style specifiers; package paths keep case.
fn normalize_specifier(specifier: &str) -> String {
    let trimmed = specifier.trim();
    if let Some(pos) = trimmed.find("://") {
        let (scheme, rest) = trimmed.split_at(pos);
        format!("{}{}", scheme.to_ascii_lowercase(), rest)
    } else {
        trimmed.to_string()
    }
}

/// Resolve a repository-local import specifier to a known file path.
fn resolve_local(
    specifier: &str,
    importer: &str,
    file_index: &HashMap<String, (String, String)>,
) -> Option<String> {
    let importer_dir = match importer.rfind('/') {
        Some(pos) => &importer[..pos],
        None => "",
    };

    // Python relative: ".b" / "..pkg.mod"
    if specifier.starts_with('.') && !specifier.starts_with("./") && !specifier.starts_with("../")
    {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let rest = &specifier[dots..];
        let mut dir = importer_dir.to_string();
        for _ in 1..dots {
            dir = match dir.rfind('/') {
                Some(pos) => dir[..pos].to_string(),
                None => String::new(),
            };
        }
        let rel = rest.replace('.', "/");
        let base = join_path(&dir, &rel);
        for candidate in [
            format!("{base}.py"),
            join_path(&base, "__init__.py"),
        ] {
            if file_index.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        return None;
    }

    // Path-style: quoted includes, JS/TS relative specifiers
    let raw = if let Some(stripped) = specifier.strip_prefix("./") {
        join_path(importer_dir, stripped)
    } else if specifier.starts_with("../") {
        join_path(importer_dir, specifier)
    } else if let Some(stripped) = specifier.strip_prefix('/') {
        stripped.to_string()
    } else {
        join_path(importer_dir, specifier)
    };
    let normalized = normalize_segments(&raw);

    if file_index.contains_key(&normalized) {
        return Some(normalized);
    }
    for ext in ["ts", "tsx", "js", "jsx", "mjs", "py", "h", "hpp"] {
        let candidate = format!("{normalized}.{ext}");
        if file_index.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    for index_file in ["index.ts", "index.tsx", "index.js", "__init__.py"] {
        let candidate = join_path(&normalized, index_file);
        if file_index.contains_key(&candidate) {
            return Some(candidate);
        }
    }

    // Quoted include given repo-root-relative: `#include "src/util.h"`
    if file_index.contains_key(specifier) {
        return Some(specifier.to_string());
    }
    None
}

fn join_path(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        dir.to_string()
    } else {
        format!("{dir}/{rest}")
    }
}

/// Collapse `.` and `..` segments of a forward-slash path.
fn normalize_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}
