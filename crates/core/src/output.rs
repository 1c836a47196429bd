//! Artifact serialization
//!
//! Writes a [`ParseOutput`] as a single JSON document, either in one buffered
//! encode or streaming element-by-element for large repositories. Array order
//! follows the mapper's canonical sort.

use serde::Serialize;
use std::io::Write;
use thiserror::Error;

use crate::schema::ParseOutput;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    #[default]
    None,
    TwoSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Buffered,
    Streaming,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub indent: Indent,
    pub mode: WriteMode,
}

/// Write the artifact to `sink`. On failure the sink is left mid-write; the
/// caller owns closing it and surfacing the error.
pub fn write(
    output: &ParseOutput,
    sink: &mut dyn Write,
    options: &OutputOptions,
) -> Result<(), OutputError> {
    match options.mode {
        WriteMode::Buffered => write_buffered(output, sink, options.indent),
        WriteMode::Streaming => write_streaming(output, sink, options.indent),
    }?;
    sink.flush()?;
    Ok(())
}

fn write_buffered(
    output: &ParseOutput,
    sink: &mut dyn Write,
    indent: Indent,
) -> Result<(), OutputError> {
    match indent {
        Indent::None => serde_json::to_writer(&mut *sink, output)?,
        Indent::TwoSpace => serde_json::to_writer_pretty(&mut *sink, output)?,
    }
    Ok(())
}

/// Emit the document shell by hand and each array element separately, so a
/// large repository never needs its whole artifact in one buffer.
fn write_streaming(
    output: &ParseOutput,
    sink: &mut dyn Write,
    indent: Indent,
) -> Result<(), OutputError> {
    match indent {
        Indent::None => {
            sink.write_all(b"{\"files\":[")?;
            write_elements(&output.files, sink, None)?;
            sink.write_all(b"],\"relationships\":[")?;
            write_elements(&output.relationships, sink, None)?;
            sink.write_all(b"],\"metadata\":")?;
            serde_json::to_writer(&mut *sink, &output.metadata)?;
            sink.write_all(b"}")?;
        }
        Indent::TwoSpace => {
            sink.write_all(b"{\n  \"files\": [\n")?;
            write_elements(&output.files, sink, Some("    "))?;
            sink.write_all(b"\n  ],\n  \"relationships\": [\n")?;
            write_elements(&output.relationships, sink, Some("    "))?;
            sink.write_all(b"\n  ],\n  \"metadata\": ")?;
            let metadata = serde_json::to_string_pretty(&output.metadata)?;
            sink.write_all(reindent(&metadata, "  ").as_bytes())?;
            sink.write_all(b"\n}\n")?;
        }
    }
    Ok(())
}

/// Comma-separated elements; no trailing comma.
fn write_elements<T: Serialize>(
    elements: &[T],
    sink: &mut dyn Write,
    indent: Option<&str>,
) -> Result<(), OutputError> {
    for (i, element) in elements.iter().enumerate() {
        match indent {
            None => {
                if i > 0 {
                    sink.write_all(b",")?;
                }
                serde_json::to_writer(&mut *sink, element)?;
            }
            Some(pad) => {
                if i > 0 {
                    sink.write_all(b",\n")?;
                }
                let pretty = serde_json::to_string_pretty(element)?;
                let mut first = true;
                for line in pretty.lines() {
                    if !first {
                        sink.write_all(b"\n")?;
                    }
                    sink.write_all(pad.as_bytes())?;
                    sink.write_all(line.as_bytes())?;
                    first = false;
                }
            }
        }
    }
    Ok(())
}

/// Indent every line after the first by `pad` (used for the inline metadata
/// object in indented streaming mode).
fn reindent(text: &str, pad: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(pad);
        }
        out.push_str(line);
    }
    out
}
