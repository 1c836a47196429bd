//! End-to-end pipeline: scan → parse → pair → map
//!
//! The only fatal conditions are a missing repository root, cancellation, and
//! a permanently closed output sink; per-file faults are collected into the
//! artifact's metadata and never abort the run.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

use crate::mapper::{map_to_output, RunTotals};
use crate::output::OutputError;
use crate::pairer::pair_headers;
use crate::parser::ParserDispatcher;
use crate::pool::ParserPool;
use crate::scanner::{scan, ScanFilter};
use crate::schema::ParseOutput;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("repository root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Scan(#[from] anyhow::Error),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Options for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct AtlasOptions {
    pub filter: ScanFilter,
    /// Parser pool size; 0 means one worker per available core.
    pub worker_count: usize,
    /// Java/Kotlin package prefix treated as repository-local.
    pub project_package: Option<String>,
    /// Fixed metadata timestamp; `None` uses the current time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl AtlasOptions {
    fn effective_workers(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Parse a repository into its knowledge-graph artifact.
pub fn parse_repository(root: &Path, options: &AtlasOptions) -> Result<ParseOutput, AtlasError> {
    parse_repository_with_cancel(root, options, None)
}

/// Like [`parse_repository`], with a cancellation flag checked between
/// pipeline stages and between files inside the pool.
pub fn parse_repository_with_cancel(
    root: &Path,
    options: &AtlasOptions,
    cancel: Option<&AtomicBool>,
) -> Result<ParseOutput, AtlasError> {
    if !root.is_dir() {
        return Err(AtlasError::RootNotFound(root.to_path_buf()));
    }

    let (scanned, mut issues) = scan(root, &options.filter)?;
    let total_files = scanned.len();
    check_cancel(cancel)?;

    let dispatcher = ParserDispatcher::with_project_package(options.project_package.clone());
    let pool = ParserPool::with_dispatcher(dispatcher, options.effective_workers());
    let (mut parsed, pool_issues) = pool.process(scanned, cancel)?;
    issues.extend(pool_issues);
    check_cancel(cancel)?;

    let pair_issues = pair_headers(&mut parsed, pool.dispatcher());
    issues.extend(pair_issues);

    let totals = RunTotals {
        total_files,
        success_count: parsed.len(),
        failure_count: total_files.saturating_sub(parsed.len()),
    };
    debug!(
        total = totals.total_files,
        parsed = totals.success_count,
        failed = totals.failure_count,
        "mapping to schema"
    );

    let timestamp = options.timestamp.unwrap_or_else(Utc::now);
    Ok(map_to_output(parsed, issues, totals, timestamp))
}

/// Run the pipeline and serialize the artifact to `sink`. Write failures
/// surface as [`AtlasError::Output`]; the caller owns closing the sink.
pub fn parse_repository_to_writer(
    root: &Path,
    options: &AtlasOptions,
    sink: &mut dyn std::io::Write,
    write_options: &crate::output::OutputOptions,
) -> Result<ParseOutput, AtlasError> {
    let output = parse_repository(root, options)?;
    crate::output::write(&output, sink, write_options)?;
    Ok(output)
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), AtlasError> {
    if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Err(AtlasError::Cancelled);
    }
    Ok(())
}
