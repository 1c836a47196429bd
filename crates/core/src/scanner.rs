//! Repository scanning with gitignore-aware filtering
//!
//! Uses the `ignore` crate (from ripgrep) to walk the repository root in a
//! deterministic lexicographic order, honoring `.gitignore` plus the
//! caller-supplied include/exclude globs, size cap, and binary detection.

use anyhow::{Context, Result};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::language::Language;
use crate::schema::{IssueKind, ParseIssue};

/// Filter options applied during the scan.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    /// When non-empty, only files matching one of these globs are kept.
    pub include_globs: Vec<String>,
    /// Paths matching any of these globs are skipped before descending.
    pub exclude_globs: Vec<String>,
    /// Files larger than this many bytes are rejected.
    pub max_size_bytes: u64,
    pub follow_symlinks: bool,
    /// Skip files with a NUL byte in the first 8 KiB.
    pub binary_detection: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            max_size_bytes: 2 * 1024 * 1024,
            follow_symlinks: false,
            binary_detection: true,
        }
    }
}

/// A classified source file produced by the scan. One snapshot; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Repo-relative path with forward slashes.
    pub path: String,
    pub abs_path: PathBuf,
    pub language: Language,
}

const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Walk `root` and classify every source file the filter admits.
///
/// Returns the files in lexicographic walk order together with per-file I/O
/// issues; individual read failures never abort the scan.
pub fn scan(root: &Path, filter: &ScanFilter) -> Result<(Vec<ScannedFile>, Vec<ParseIssue>)> {
    let root = root
        .canonicalize()
        .with_context(|| format!("repository root not found: {}", root.display()))?;

    let mut builder = WalkBuilder::new(&root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(filter.follow_symlinks)
        .max_filesize(Some(filter.max_size_bytes))
        .sort_by_file_name(|a, b| a.cmp(b));

    // Includes are plain override globs; excludes are negated, gitignore-style.
    if !filter.include_globs.is_empty() || !filter.exclude_globs.is_empty() {
        let mut overrides = OverrideBuilder::new(&root);
        for pattern in &filter.include_globs {
            overrides.add(pattern)?;
        }
        for pattern in &filter.exclude_globs {
            let glob = if pattern.ends_with('/') {
                format!("!{}**", pattern)
            } else {
                format!("!{}", pattern)
            };
            overrides.add(&glob)?;
        }
        builder.overrides(overrides.build()?);
    }

    let mut files = Vec::new();
    let mut issues = Vec::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                issues.push(ParseIssue::new(
                    String::new(),
                    IssueKind::Filesystem,
                    format!("unreadable directory entry: {e}"),
                ));
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let abs_path = entry.into_path();
        let rel = relative_slash_path(&abs_path, &root);

        let mut head = [0u8; BINARY_SNIFF_LEN];
        let head_len = if filter.binary_detection {
            match sniff(&abs_path, &mut head) {
                Ok(n) => n,
                Err(e) => {
                    issues.push(ParseIssue::new(
                        rel.clone(),
                        IssueKind::Filesystem,
                        format!("failed to read file: {e}"),
                    ));
                    continue;
                }
            }
        } else {
            0
        };

        if filter.binary_detection && head[..head_len].contains(&0) {
            debug!(path = %rel, "skipping binary file");
            continue;
        }

        let language = match Language::from_path(&abs_path)
            .or_else(|| shebang_language(&head[..head_len]))
        {
            Some(lang) => lang,
            None => continue,
        };

        files.push(ScannedFile {
            path: rel,
            abs_path,
            language,
        });
    }

    debug!(count = files.len(), "scan complete");
    Ok((files, issues))
}

fn relative_slash_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn sniff(path: &Path, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < buf.len() {
        let n = file.read(&mut buf[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    Ok(read)
}

/// Classify extensionless scripts by their shebang line.
fn shebang_language(head: &[u8]) -> Option<Language> {
    if !head.starts_with(b"#!") {
        return None;
    }
    let first_line = head.split(|&b| b == b'\n').next()?;
    let line = String::from_utf8_lossy(first_line);
    if line.contains("python") {
        Some(Language::Python)
    } else if line.contains("node") {
        Some(Language::JavaScript)
    } else {
        None
    }
}
