//! Header/implementation pairing for C-family files
//!
//! After parsing, each `.c`/`.cpp`/`.m` file is paired with the header that
//! shares its directory and stem. Headers that parsed as C are re-parsed as
//! C++ or Objective-C when the implementation side requires it. Declarations
//! in the header are matched to definitions in the implementation by a
//! tolerant signature comparison, producing `implements_declaration` and
//! `implements_header` dependencies on the implementation file.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::language::Language;
use crate::parser::docs::collapse_ws;
use crate::parser::{ParsedDependency, ParsedFile, ParsedSymbol, ParserDispatcher};
use crate::schema::{EdgeType, IssueKind, ParseIssue};

const HEADER_EXTS: &[&str] = &["h", "hpp", "hxx"];
const IMPL_EXTS: &[&str] = &["c", "cc", "cpp", "cxx", "m", "mm"];

/// Pair headers with implementation files and add the resulting
/// dependencies. Mutates `files` in place (header promotion re-parses the
/// header under its new language). Deterministic: running twice adds no new
/// facts because the mapper deduplicates edges by id.
pub fn pair_headers(files: &mut [ParsedFile], dispatcher: &ParserDispatcher) -> Vec<ParseIssue> {
    let mut issues = Vec::new();

    // (dir, stem) → header indices
    let mut headers: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, file) in files.iter().enumerate() {
        let (dir, stem, ext) = split_path(&file.path);
        if HEADER_EXTS.contains(&ext) {
            headers.entry((dir, stem)).or_default().push(idx);
        }
    }

    let impl_indices: Vec<usize> = files
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            let (_, _, ext) = split_path(&f.path);
            IMPL_EXTS.contains(&ext)
        })
        .map(|(idx, _)| idx)
        .collect();

    for impl_idx in impl_indices {
        let (dir, stem, impl_ext) = split_path(&files[impl_idx].path);
        let Some(candidates) = headers.get(&(dir, stem)) else {
            continue;
        };
        let Some(&header_idx) = pick_header(candidates, files, impl_ext) else {
            continue;
        };

        // Promote the header's language to match the implementation side
        let impl_language = files[impl_idx].language;
        let wanted = match impl_language {
            Language::Cpp => Language::Cpp,
            Language::ObjC => Language::ObjC,
            _ => Language::C,
        };
        if files[header_idx].language != wanted && wanted != Language::C {
            promote_header(files, header_idx, wanted, dispatcher, &mut issues);
        }

        let header_path = files[header_idx].path.clone();
        let header_decls = function_signatures(&files[header_idx].symbols);
        if header_decls.is_empty() && files[header_idx].symbols.is_empty() {
            continue;
        }
        let impl_defs = function_signatures(&files[impl_idx].symbols);

        let mut deps: Vec<ParsedDependency> = Vec::new();
        for (decl_name, decl_sig) in &header_decls {
            for (def_name, def_sig) in &impl_defs {
                if base_name(def_name) != base_name(decl_name) {
                    continue;
                }
                let (Some(decl), Some(def)) =
                    (split_signature(decl_sig), split_signature(def_sig))
                else {
                    continue;
                };
                if params_match(&decl.params, &def.params) {
                    deps.push(ParsedDependency {
                        edge_type: EdgeType::ImplementsDeclaration,
                        source: def_name.clone(),
                        target: decl_name.clone(),
                        target_module: header_path.clone(),
                        is_external: false,
                        is_stdlib: false,
                    });
                    break;
                }
            }
        }

        debug!(
            implementation = %files[impl_idx].path,
            header = %header_path,
            matched = deps.len(),
            "paired header"
        );

        // File-level edge between the two module symbols
        deps.push(ParsedDependency {
            edge_type: EdgeType::ImplementsHeader,
            source: String::new(),
            target: String::new(),
            target_module: header_path,
            is_external: false,
            is_stdlib: false,
        });

        files[impl_idx].dependencies.extend(deps);
    }

    issues
}

/// Prefer the extension-family match (`.cpp` ↔ `.hpp` over `.cpp` ↔ `.h`),
/// then the lexicographically smallest path.
fn pick_header<'a>(
    candidates: &'a [usize],
    files: &[ParsedFile],
    impl_ext: &str,
) -> Option<&'a usize> {
    let family_rank = |header_ext: &str| -> u8 {
        let cpp_impl = matches!(impl_ext, "cc" | "cpp" | "cxx");
        let cpp_header = matches!(header_ext, "hpp" | "hxx");
        if cpp_impl == cpp_header {
            0
        } else {
            1
        }
    };
    candidates.iter().min_by_key(|&&idx| {
        let (_, _, ext) = split_path(&files[idx].path);
        (family_rank(ext), files[idx].path.clone())
    })
}

fn promote_header(
    files: &mut [ParsedFile],
    header_idx: usize,
    language: Language,
    dispatcher: &ParserDispatcher,
    issues: &mut Vec<ParseIssue>,
) {
    let path = files[header_idx].path.clone();
    let source = files[header_idx].source.clone();
    match dispatcher.parse_source(&path, language, &source) {
        Ok(reparsed) => {
            files[header_idx] = reparsed;
        }
        Err(e) => {
            warn!(path = %path, error = %e, "header re-parse failed; keeping C parse");
            issues.push(ParseIssue::new(
                path,
                IssueKind::Parse,
                format!("header promotion re-parse failed: {e}"),
            ));
        }
    }
}

/// `(name, signature)` of every function-like symbol, at any nesting depth.
fn function_signatures(symbols: &[ParsedSymbol]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    fn walk(symbols: &[ParsedSymbol], out: &mut Vec<(String, String)>) {
        for s in symbols {
            if matches!(s.kind.as_str(), "function" | "static_function" | "method") {
                out.push((s.name.clone(), s.signature.clone()));
            }
            walk(&s.children, out);
        }
    }
    walk(symbols, &mut out);
    out
}

/// Rightmost segment of a possibly `Class::method`-qualified name.
fn base_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// A C-family signature split into its comparable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSignature {
    pub return_type: String,
    pub name: String,
    pub params: Vec<String>,
}

/// Tolerant signature parser: splits at the parameter list, takes the last
/// token before `(` as the name, and normalizes each parameter to its type
/// (parameter names are dropped, function-pointer declarators keep their
/// shape with the identifier removed, array suffixes fold into the type).
pub fn split_signature(signature: &str) -> Option<CSignature> {
    let sig = collapse_ws(signature);
    let open = sig.find('(')?;
    let close = sig.rfind(')')?;
    if close < open {
        return None;
    }

    let before = sig[..open].trim();
    let name_token = before.split_whitespace().last()?;
    let name = name_token.trim_start_matches(['*', '&']).to_string();
    if name.is_empty() {
        return None;
    }

    let stars: String = name_token
        .chars()
        .take_while(|c| *c == '*' || *c == '&')
        .collect();
    let mut return_type = before[..before.len() - name_token.len()].trim().to_string();
    if !stars.is_empty() {
        return_type.push(' ');
        return_type.push_str(&stars);
    }

    let params: Vec<String> = split_top_level(&sig[open + 1..close])
        .into_iter()
        .map(|p| normalize_param(&p))
        .filter(|p| !p.is_empty() && p != "void")
        .collect();

    Some(CSignature {
        return_type: collapse_ws(&return_type),
        name,
        params,
    })
}

/// Split a parameter list at commas outside any nesting.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' | '[' | '<' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '>' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Normalize one parameter down to its type.
fn normalize_param(param: &str) -> String {
    let p = collapse_ws(param);
    if p.is_empty() || p == "..." || p == "void" {
        return p;
    }

    // Function-pointer declarator: `int (*cb)(int)` → `int (*)(int)`
    if let Some(pos) = p.find("(*") {
        let after = &p[pos + 2..];
        let ident_len = after
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .count();
        let mut out = String::with_capacity(p.len());
        out.push_str(&p[..pos + 2]);
        out.push_str(&after[ident_len..]);
        return collapse_ws(&out);
    }

    let mut tokens: Vec<&str> = p.split_whitespace().collect();
    if tokens.len() < 2 {
        return p;
    }
    let last = *tokens.last().unwrap_or(&"");

    // Array parameter: `int a[4]` → `int [4]`
    if let Some(bracket) = last.find('[') {
        let (ident, suffix) = last.split_at(bracket);
        let stars: String = ident.chars().take_while(|c| *c == '*' || *c == '&').collect();
        tokens.pop();
        let mut out = tokens.join(" ");
        if !stars.is_empty() {
            out.push(' ');
            out.push_str(&stars);
        }
        out.push(' ');
        out.push_str(suffix);
        return out;
    }

    // Pointer with the name attached: `char *buf` → `char *`
    if last.starts_with('*') || last.starts_with('&') {
        let stars: String = last.chars().take_while(|c| *c == '*' || *c == '&').collect();
        tokens.pop();
        return format!("{} {}", tokens.join(" "), stars);
    }

    // Plain trailing identifier with no pointer marker is the parameter name
    if last.chars().all(|c| c.is_alphanumeric() || c == '_') {
        tokens.pop();
        return tokens.join(" ");
    }

    p
}

/// Structural parameter equality, ignoring spacing.
fn params_match(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| despace(x) == despace(y))
}

fn despace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `(directory, stem, extension)` of a forward-slash repo-relative path.
fn split_path(path: &str) -> (String, String, &str) {
    let (dir, file) = match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    };
    let (stem, ext) = match file.rfind('.') {
        Some(pos) => (&file[..pos], &file[pos + 1..]),
        None => (file, ""),
    };
    (dir.to_string(), stem.to_string(), ext)
}
