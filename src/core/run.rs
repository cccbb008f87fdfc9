//! One replace run, end to end.
//!
//! `Idle -> Initializing -> Scanning -> Converting -> {Committing | Failed}
//! -> Cleaning -> Done`. The staging root is created fresh at the start and
//! removed on every exit path, including fatal errors and panics.

use std::{
    io,
    path::{Path, PathBuf},
};

use tracing::{info, instrument, warn};

use super::{
    commit::commit,
    engine::{ConversionEngine, DEFAULT_CHUNK_SIZE, ProgressSink},
    error::ReplaceError,
    pattern::{DEFAULT_BATCH_SIZE, KeyBatch, KeyMode, build_batches},
    staging::StagingStore,
};
use crate::infra::walk::{FileWalker, WalkError};

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = ".srr-staging";

/// Lifecycle phases reported to a [`RunObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Initializing,
    Scanning,
    Converting,
    Committing,
    Failed,
    Cleaning,
    Done,
}

/// Hooks for whatever renders the run; all optional except progress.
pub trait RunObserver: ProgressSink {
    fn on_phase(&self, _phase: RunPhase) {}

    fn on_staging_ready(&self, _root: &Path) {}

    fn on_scanned(&self, _files: usize) {}

    /// Called once per run after the staging root was removed, or failed to be.
    fn on_staging_cleared(&self, _root: &Path, _error: Option<&io::Error>) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressSink for Silent {
    fn advance(&self, _completed: u64, _total: u64) {}
}

impl RunObserver for Silent {}

/// Everything a run needs; the staging root is explicit, not ambient.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_dir: PathBuf,
    pub extension: Option<String>,
    pub keys: Vec<String>,
    pub from: String,
    pub to: String,
    pub mode: KeyMode,
    pub staging_dir: PathBuf,
    pub chunk_size: usize,
    pub batch_size: usize,
    pub ignore_patterns: Vec<String>,
    pub respect_gitignore: bool,
    /// Convert into staging but skip the commit
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(
        target_dir: impl Into<PathBuf>,
        keys: Vec<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            target_dir: target_dir.into(),
            extension: None,
            keys,
            from: from.into(),
            to: to.into(),
            mode: KeyMode::default(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            ignore_patterns: Vec::new(),
            respect_gitignore: false,
            dry_run: false,
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    pub fn with_mode(mut self, mode: KeyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn validate(&self) -> Result<(), ReplaceError> {
        if self.chunk_size == 0 {
            return Err(ReplaceError::InvalidOptions(
                "chunk size must be greater than zero".into(),
            ));
        }
        if !self.target_dir.is_dir() {
            return Err(ReplaceError::InvalidOptions(format!(
                "target is not a directory: {}",
                self.target_dir.display()
            )));
        }
        Ok(())
    }
}

/// Outcome of a run that reached `Done` without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub batches: usize,
    pub jobs: usize,
    /// Files altered by at least one substitution
    pub changed: usize,
    /// Files moved onto the originals; 0 on dry runs
    pub committed: usize,
    pub dry_run: bool,
    pub staging_root: PathBuf,
}

/// Absolute form of `path` without requiring it to exist.
fn absolutize(path: &Path) -> Result<PathBuf, ReplaceError> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ReplaceError::StagingInit {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };

    // Canonicalize the parent so comparisons with the target line up
    match (abs.parent(), abs.file_name()) {
        (Some(parent), Some(name)) => match dunce::canonicalize(parent) {
            Ok(parent) => Ok(parent.join(name)),
            Err(_) => Ok(abs),
        },
        _ => Ok(abs),
    }
}

/// Execute a full run and report the aggregate result.
#[instrument(skip_all, fields(target = %opts.target_dir.display(), keys = opts.keys.len()))]
pub fn execute<O>(opts: &RunOptions, observer: &O) -> Result<RunSummary, ReplaceError>
where
    O: RunObserver + ?Sized,
{
    observer.on_phase(RunPhase::Idle);
    opts.validate()?;

    let target_root = dunce::canonicalize(&opts.target_dir).map_err(|source| WalkError::Io {
        path: opts.target_dir.clone(),
        source,
    })?;
    let staging_root = absolutize(&opts.staging_dir)?;
    if target_root.starts_with(&staging_root) {
        return Err(ReplaceError::InvalidOptions(format!(
            "staging dir {} would contain the target {}",
            staging_root.display(),
            target_root.display()
        )));
    }

    let batches = build_batches(&opts.keys, opts.mode, opts.batch_size)?;

    observer.on_phase(RunPhase::Initializing);
    let store = StagingStore::new(&staging_root, &target_root);
    store.init()?;
    let guard = store.guard();
    observer.on_staging_ready(store.root());

    let result = convert_and_commit(opts, &store, &batches, observer);
    if let Err(e) = &result {
        warn!(error = e as &dyn std::error::Error, "run failed");
        observer.on_phase(RunPhase::Failed);
    }

    observer.on_phase(RunPhase::Cleaning);
    let cleared = guard.release();
    if let Err(e) = &cleared {
        warn!(root = %staging_root.display(), error = %e, "failed to clear staging root");
    }
    observer.on_staging_cleared(store.root(), cleared.as_ref().err());
    observer.on_phase(RunPhase::Done);

    result
}

fn convert_and_commit<O>(
    opts: &RunOptions,
    store: &StagingStore,
    batches: &[KeyBatch],
    observer: &O,
) -> Result<RunSummary, ReplaceError>
where
    O: RunObserver + ?Sized,
{
    observer.on_phase(RunPhase::Scanning);
    let walker = FileWalker::new(&opts.ignore_patterns)?
        .with_extension(opts.extension.as_deref())
        .with_gitignore(opts.respect_gitignore)
        .with_skip_dir(store.root());
    let files = walker.walk_files(store.target_root())?;
    info!(files = files.len(), "scan complete");
    observer.on_scanned(files.len());

    observer.on_phase(RunPhase::Converting);
    let report = ConversionEngine::new(store, &opts.from, &opts.to)
        .with_chunk_size(opts.chunk_size)
        .run(&files, batches, observer);
    let changed = report.changed_files().len();
    let outcomes = report.into_result()?;

    let committed = if opts.dry_run {
        info!("dry run, skipping commit");
        0
    } else {
        observer.on_phase(RunPhase::Committing);
        commit(store)?
    };

    Ok(RunSummary {
        files: files.len(),
        batches: batches.len(),
        jobs: outcomes.len(),
        changed,
        committed,
        dry_run: opts.dry_run,
        staging_root: store.root().to_path_buf(),
    })
}
