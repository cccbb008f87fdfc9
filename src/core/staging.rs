//! Staging mirror tree.
//!
//! Every conversion writes into `<staging_root>/<path relative to target>`.
//! Reads prefer the staged copy and fall back to the original, so successive
//! batches see each other's output while the originals stay untouched.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::error::ReplaceError;

/// Written into every staging root this tool creates. A directory is only
/// ever cleared when it is missing, empty, or carries this marker.
pub const STAGING_MARKER: &str = ".srr-staging-root";

/// Run-scoped staging area mirroring `target_root`.
#[derive(Debug, Clone)]
pub struct StagingStore {
    staging_root: PathBuf,
    target_root: PathBuf,
}

impl StagingStore {
    pub fn new(staging_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            target_root: target_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.staging_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn marker_path(&self) -> PathBuf {
        self.staging_root.join(STAGING_MARKER)
    }

    /// Whether `clear` may remove the root: missing, an empty directory, or
    /// a remnant of an earlier run.
    pub fn is_reclaimable(&self) -> io::Result<bool> {
        if !self.staging_root.try_exists()? {
            return Ok(true);
        }
        if !self.staging_root.is_dir() {
            return Ok(false);
        }
        if self.marker_path().try_exists()? {
            return Ok(true);
        }
        Ok(fs::read_dir(&self.staging_root)?.next().is_none())
    }

    /// Remove any stale remnant, then create the root empty and marked.
    /// Refuses to touch an existing directory this tool did not create.
    pub fn init(&self) -> Result<(), ReplaceError> {
        let init_err = |source| ReplaceError::StagingInit {
            path: self.staging_root.clone(),
            source,
        };

        if !self.is_reclaimable().map_err(init_err)? {
            return Err(ReplaceError::InvalidOptions(format!(
                "staging dir {} already exists and was not created by a previous run",
                self.staging_root.display()
            )));
        }

        self.clear().map_err(init_err)?;
        fs::create_dir_all(&self.staging_root).map_err(init_err)?;
        fs::write(self.marker_path(), "").map_err(init_err)?;

        debug!(root = %self.staging_root.display(), "staging root created");
        Ok(())
    }

    /// Recursive, idempotent removal of the staging root.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.staging_root) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Staging counterpart of an original path under the target root.
    pub fn resolve_staging_path(&self, original: &Path) -> io::Result<PathBuf> {
        let rel = original.strip_prefix(&self.target_root).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} is not under {}",
                    original.display(),
                    self.target_root.display()
                ),
            )
        })?;

        Ok(self.staging_root.join(rel))
    }

    /// Current content for `original`: staged copy if present, else original.
    pub fn read_current(&self, original: &Path) -> io::Result<String> {
        let staged = self.resolve_staging_path(original)?;
        let source = if staged.try_exists()? {
            staged.as_path()
        } else {
            original
        };

        fs::read_to_string(source)
    }

    /// Write `content` at `staging_path`, creating parents and replacing any
    /// earlier staged output for the same file.
    pub fn write(&self, staging_path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = staging_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(staging_path, content)
    }

    /// Clears the staging root when dropped unless released explicitly.
    pub fn guard(&self) -> StagingGuard<'_> {
        StagingGuard {
            store: self,
            armed: true,
        }
    }
}

/// Cleanup guard: the staging root never outlives the run, even on panic.
pub struct StagingGuard<'a> {
    store: &'a StagingStore,
    armed: bool,
}

impl StagingGuard<'_> {
    /// Clear now and report the outcome.
    pub fn release(mut self) -> io::Result<()> {
        self.armed = false;
        self.store.clear()
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.store.clear()
        {
            warn!(root = %self.store.root().display(), error = %e, "failed to clear staging root");
        }
    }
}
