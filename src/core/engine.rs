//! Conversion engine.
//!
//! A job is one (file, key batch) pair: read the current content through the
//! staging store, rewrite `from` to `to` inside every match of the batch
//! matcher, and write the whole result back to the file's staging path.
//!
//! Files are processed in chunks. Jobs inside a chunk run in parallel and the
//! engine waits for all of them to settle before moving on; a failing job is
//! recorded and never cancels its siblings. Batches form the outer loop and
//! run strictly in sequence so batch N reads what batch N-1 wrote.

use std::{
    borrow::Cow,
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use regex::{Captures, Regex};
use tracing::{debug, instrument, warn};

use super::{
    error::{JobError, JobStage, ReplaceError},
    pattern::KeyBatch,
    staging::StagingStore,
};

/// Files converted concurrently before the engine waits.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Receives (completed, total) job counts as chunks settle.
pub trait ProgressSink: Sync {
    fn advance(&self, completed: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Sync,
{
    fn advance(&self, completed: u64, total: u64) {
        self(completed, total)
    }
}

/// Rewrite `from` to `to` inside each non-overlapping match of `matcher`.
/// Text outside a match is returned untouched.
pub fn convert_content<'a>(
    content: &'a str,
    matcher: &Regex,
    from: &str,
    to: &str,
) -> Cow<'a, str> {
    matcher.replace_all(content, |caps: &Captures<'_>| caps[0].replace(from, to))
}

/// Successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub path: PathBuf,
    pub batch: usize,
    /// Whether this job altered the content it read
    pub changed: bool,
}

/// Every job outcome of a run, in (batch, file) order.
#[derive(Debug, Default)]
pub struct EngineReport {
    pub outcomes: Vec<Result<JobOutcome, JobError>>,
}

impl EngineReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Files altered by at least one successful job.
    pub fn changed_files(&self) -> BTreeSet<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .filter(|o| o.changed)
            .map(|o| o.path.as_path())
            .collect()
    }

    /// Escalate to [`ReplaceError::Aggregate`] if any job failed.
    pub fn into_result(self) -> Result<Vec<JobOutcome>, ReplaceError> {
        let total = self.outcomes.len();
        let (ok, failed): (Vec<_>, Vec<_>) = self.outcomes.into_iter().partition(Result::is_ok);

        let failed_count = failed.len();
        match failed.into_iter().find_map(Result::err) {
            Some(first) => Err(ReplaceError::Aggregate {
                failed: failed_count,
                total,
                first,
            }),
            None => Ok(ok.into_iter().filter_map(Result::ok).collect()),
        }
    }
}

/// Applies key batches to files through a [`StagingStore`].
#[derive(Debug, Clone)]
pub struct ConversionEngine<'a> {
    store: &'a StagingStore,
    from: &'a str,
    to: &'a str,
    chunk_size: usize,
}

impl<'a> ConversionEngine<'a> {
    pub fn new(store: &'a StagingStore, from: &'a str, to: &'a str) -> Self {
        Self {
            store,
            from,
            to,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run one job. Never touches the original file.
    pub fn convert_file(&self, path: &Path, batch: &KeyBatch) -> Result<JobOutcome, JobError> {
        let fail = |stage, source| JobError {
            path: path.to_path_buf(),
            batch: batch.index(),
            stage,
            source,
        };

        let staging_path = self
            .store
            .resolve_staging_path(path)
            .map_err(|e| fail(JobStage::Resolve, e))?;
        let content = self
            .store
            .read_current(path)
            .map_err(|e| fail(JobStage::Read, e))?;

        let converted = convert_content(&content, batch.matcher(), self.from, self.to);
        let changed = converted != content.as_str();

        self.store
            .write(&staging_path, &converted)
            .map_err(|e| fail(JobStage::Write, e))?;

        Ok(JobOutcome {
            path: path.to_path_buf(),
            batch: batch.index(),
            changed,
        })
    }

    /// Apply every batch to every file, batch-major, chunk by chunk.
    #[instrument(skip_all, fields(files = files.len(), batches = batches.len()))]
    pub fn run<P>(&self, files: &[PathBuf], batches: &[KeyBatch], progress: &P) -> EngineReport
    where
        P: ProgressSink + ?Sized,
    {
        let total = (files.len() * batches.len()) as u64;
        let mut completed = 0u64;
        let mut report = EngineReport {
            outcomes: Vec::with_capacity(total as usize),
        };

        progress.advance(completed, total);

        for batch in batches {
            for (chunk_no, chunk) in files.chunks(self.chunk_size).enumerate() {
                // Settle all: every job in the chunk reports back
                let settled: Vec<Result<JobOutcome, JobError>> = chunk
                    .par_iter()
                    .map(|path| self.convert_file(path, batch))
                    .collect();

                for err in settled.iter().filter_map(|r| r.as_ref().err()) {
                    warn!(error = err as &dyn std::error::Error, "conversion job failed");
                }

                completed += chunk.len() as u64;
                debug!(batch = batch.index(), chunk = chunk_no, completed, total, "chunk settled");

                report.outcomes.extend(settled);
                progress.advance(completed, total);
            }
        }

        report
    }
}
