//! Bounded parallel parsing pool
//!
//! A dedicated rayon thread pool of exactly `worker_count` threads pulls
//! scanned files through a streaming bridge, so no more than a pool's worth
//! of unparsed files is ever buffered past the read head. Parser state is
//! created per parse call; workers share only the immutable grammar tables.

use anyhow::{Context, Result};
use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::parser::{ParsedFile, ParserDispatcher};
use crate::scanner::ScannedFile;
use crate::schema::{IssueKind, ParseIssue};

/// Parallel parser pool over a [`ParserDispatcher`].
pub struct ParserPool {
    dispatcher: ParserDispatcher,
    worker_count: usize,
}

impl ParserPool {
    pub fn new(worker_count: usize) -> Self {
        Self::with_dispatcher(ParserDispatcher::new(), worker_count)
    }

    pub fn with_dispatcher(dispatcher: ParserDispatcher, worker_count: usize) -> Self {
        Self {
            dispatcher,
            worker_count: worker_count.max(1),
        }
    }

    pub fn dispatcher(&self) -> &ParserDispatcher {
        &self.dispatcher
    }

    /// Parse every file, in parallel, collecting hard failures as issues.
    ///
    /// Output order is not guaranteed to match input order; downstream
    /// consumers are order-independent and the final artifact is sorted.
    /// When `cancel` is set, workers stop picking up new files; in-flight
    /// parses finish.
    pub fn process(
        &self,
        files: Vec<ScannedFile>,
        cancel: Option<&AtomicBool>,
    ) -> Result<(Vec<ParsedFile>, Vec<ParseIssue>)> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .build()
            .context("failed to build parser thread pool")?;

        debug!(files = files.len(), workers = self.worker_count, "parsing");

        let results: Vec<(Option<ParsedFile>, Option<ParseIssue>)> = pool.install(|| {
            files
                .into_iter()
                .par_bridge()
                .map(|file| self.parse_one(&file, cancel))
                .collect()
        });

        let mut parsed = Vec::new();
        let mut issues = Vec::new();
        for (file, issue) in results {
            if let Some(file) = file {
                parsed.push(file);
            }
            if let Some(issue) = issue {
                issues.push(issue);
            }
        }
        Ok((parsed, issues))
    }

    fn parse_one(
        &self,
        file: &ScannedFile,
        cancel: Option<&AtomicBool>,
    ) -> (Option<ParsedFile>, Option<ParseIssue>) {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return (None, None);
        }

        let source = match std::fs::read_to_string(&file.abs_path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %file.path, error = %e, "read failed");
                return (
                    None,
                    Some(ParseIssue::new(
                        file.path.clone(),
                        IssueKind::Filesystem,
                        format!("failed to read file: {e}"),
                    )),
                );
            }
        };

        match self
            .dispatcher
            .parse_source(&file.path, file.language, &source)
        {
            Ok(parsed) => (Some(parsed), None),
            Err(e) => {
                warn!(path = %file.path, error = %e, "parse failed");
                (
                    None,
                    Some(ParseIssue::new(
                        file.path.clone(),
                        IssueKind::Parse,
                        e.to_string(),
                    )),
                )
            }
        }
    }
}
