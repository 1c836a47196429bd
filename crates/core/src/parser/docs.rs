//! Shared docstring and signature helpers used by every language parser

use tree_sitter::Node;

/// Comment node kinds across the supported grammars.
const COMMENT_KINDS: &[&str] = &[
    "comment",
    "line_comment",
    "block_comment",
    "multiline_comment",
    "documentation_comment",
];

pub fn is_comment_kind(kind: &str) -> bool {
    COMMENT_KINDS.contains(&kind)
}

/// Extract the docstring for a symbol: the comment(s) immediately preceding
/// its syntactic start, with only whitespace (and no blank line) between.
///
/// A contiguous run of line comments is concatenated in source order; a block
/// comment stands alone. Comment markers are stripped, internal newlines are
/// preserved.
pub fn doc_comment_before(node: &Node, source: &str) -> String {
    let mut comments: Vec<Node> = Vec::new();
    let mut current = *node;

    while let Some(prev) = current.prev_sibling() {
        if !is_comment_kind(prev.kind()) {
            break;
        }
        let gap = &source[prev.end_byte()..current.start_byte()];
        if !gap.chars().all(char::is_whitespace) || gap.matches('\n').count() > 1 {
            break;
        }
        let is_block = {
            let text = node_str(&prev, source);
            text.starts_with("/*")
        };
        comments.push(prev);
        current = prev;
        if is_block {
            // A block comment is the whole docstring; don't merge past it.
            break;
        }
    }

    if comments.is_empty() {
        return String::new();
    }
    comments.reverse();

    let parts: Vec<String> = comments
        .iter()
        .map(|c| strip_comment_markers(node_str(c, source)))
        .filter(|s| !s.is_empty())
        .collect();
    parts.join("\n")
}

/// Strip comment markers from a single comment: `//`, `///`, `#`, and
/// `/* … */` forms, including the leading `*` on block continuation lines.
pub fn strip_comment_markers(text: &str) -> String {
    let trimmed = text.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("/*") {
        rest.strip_suffix("*/").unwrap_or(rest)
    } else {
        trimmed
    };

    let lines: Vec<String> = body
        .lines()
        .map(|line| {
            let l = line.trim_start();
            let l = l
                .strip_prefix("///")
                .or_else(|| l.strip_prefix("//!"))
                .or_else(|| l.strip_prefix("//"))
                .or_else(|| l.strip_prefix("#"))
                .unwrap_or(l);
            // Block comment continuation: "* text"
            let l = l.strip_prefix("**").unwrap_or(l);
            let l = l.strip_prefix('*').unwrap_or(l);
            l.trim().to_string()
        })
        .collect();

    let joined = lines.join("\n");
    joined.trim().to_string()
}

/// Collapse internal whitespace runs to single spaces and trim.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A symbol's normalized signature: its header text up to (excluding) the
/// first stop character at bracket depth zero, whitespace-collapsed.
///
/// Stop characters are `{`/`;` for brace languages and `:` for Python.
pub fn signature_text(node: &Node, source: &str, stops: &[char]) -> String {
    let text = node_str(node, source);
    collapse_ws(header_before_body(text, stops))
}

/// Slice `text` up to the first stop character at paren/bracket depth zero.
pub fn header_before_body<'a>(text: &'a str, stops: &[char]) -> &'a str {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {
                if depth == 0 && stops.contains(&ch) {
                    return &text[..i];
                }
            }
        }
    }
    text
}

fn node_str<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}
