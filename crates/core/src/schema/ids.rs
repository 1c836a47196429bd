//! Deterministic identifier assignment
//!
//! Every id in the artifact is a UUIDv5 name-hash over a fixed namespace, so
//! re-running the pipeline on the same tree yields the same ids regardless of
//! parse order or the absolute location of the repository root.

use uuid::Uuid;

/// Fixed namespace for all CodeAtlas ids.
const NAMESPACE: Uuid = Uuid::from_u128(0x8f14_52dc_7a30_4c6e_9b21_d05e_33ab_41c7);

/// Path of the synthetic file owning all external symbols.
pub const EXTERNAL_FILE_PATH: &str = "__external__";

/// Id of a file, derived from its repo-relative path.
pub fn file_id(path: &str) -> String {
    Uuid::new_v5(&NAMESPACE, path.as_bytes()).to_string()
}

/// Id of the synthetic `__external__` file.
pub fn external_file_id() -> String {
    file_id(EXTERNAL_FILE_PATH)
}

/// Id of a symbol, derived from its owning file, name, and start location.
/// Two symbols in one file cannot share (name, start_line, start_byte).
pub fn symbol_id(file_id: &str, name: &str, start_line: u32, start_byte: usize) -> String {
    let key = format!("{file_id}:{name}:{start_line}:{start_byte}");
    Uuid::new_v5(&NAMESPACE, key.as_bytes()).to_string()
}

/// Id of an edge, derived from its source, target (id or module), and kind.
pub fn edge_id(source_id: &str, target: &str, edge_type: &str) -> String {
    let key = format!("{source_id}:{target}:{edge_type}");
    Uuid::new_v5(&NAMESPACE, key.as_bytes()).to_string()
}
