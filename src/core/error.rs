//! Failure taxonomy for a replace run.
//!
//! Fatal errors (`Traversal`, `StagingInit`, `Pattern`, `InvalidOptions`,
//! `Commit`) stop the run where they happen. Per-job failures are recorded as
//! [`JobError`] and only escalate to [`ReplaceError::Aggregate`] once every job
//! has settled.

use std::{fmt, io, path::PathBuf};

use crate::infra::walk::WalkError;

/// Step of a single conversion job that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Mapping the original path under the staging root
    Resolve,
    /// Reading the staged copy or the original
    Read,
    /// Creating staging parents or writing the staged copy
    Write,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Resolve => write!(f, "resolve"),
            JobStage::Read => write!(f, "read"),
            JobStage::Write => write!(f, "write"),
        }
    }
}

/// One (file x batch) conversion that did not reach the staging store.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed for {} (batch {batch})", path.display())]
pub struct JobError {
    pub path: PathBuf,
    pub batch: usize,
    pub stage: JobStage,
    #[source]
    pub source: io::Error,
}

/// Terminal failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("traversal failed")]
    Traversal(#[from] WalkError),

    #[error("cannot prepare staging root {}", path.display())]
    StagingInit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid key pattern")]
    Pattern(#[from] super::pattern::PatternError),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Raised after all jobs settled; carries the first failure seen.
    #[error("{failed} of {total} conversions failed; originals left untouched. First failure")]
    Aggregate {
        failed: usize,
        total: usize,
        #[source]
        first: JobError,
    },

    #[error("commit failed at {}", path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReplaceError {
    /// True when the originals are guaranteed untouched by this failure.
    pub fn originals_untouched(&self) -> bool {
        !matches!(self, ReplaceError::Commit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Display text of every error in the chain, outermost first.
    fn chain(err: &dyn std::error::Error) -> Vec<String> {
        let mut out = vec![err.to_string()];
        let mut next = err.source();
        while let Some(e) = next {
            out.push(e.to_string());
            next = e.source();
        }
        out
    }

    #[test]
    fn aggregate_names_the_io_reason_once() {
        let err = ReplaceError::Aggregate {
            failed: 1,
            total: 4,
            first: JobError {
                path: PathBuf::from("src/a.rs"),
                batch: 0,
                stage: JobStage::Read,
                source: io::Error::new(io::ErrorKind::InvalidData, "not utf-8"),
            },
        };

        let links = chain(&err);
        assert_eq!(links.len(), 3);
        assert_eq!(links[1], "read failed for src/a.rs (batch 0)");
        assert_eq!(links.iter().filter(|l| l.contains("not utf-8")).count(), 1);
    }

    #[test]
    fn only_commit_touches_originals() {
        let commit = ReplaceError::Commit {
            path: PathBuf::from("a"),
            source: io::Error::other("boom"),
        };
        assert!(!commit.originals_untouched());
        assert!(ReplaceError::InvalidOptions("x".into()).originals_untouched());
    }
}
