//! Commit staged output onto the original tree.
//!
//! Each staged file is renamed onto its original path. Rename requires the
//! staging root and the target to share a volume; across devices the file is
//! copied and the staged copy removed instead.

use std::{fs, io, path::Path};

use tracing::{debug, info, instrument};

use super::{error::ReplaceError, staging::StagingStore};
use crate::infra::walk::FileWalker;

/// Move every staged file over its original. Returns the number moved.
#[instrument(skip_all, fields(staging = %store.root().display()))]
pub fn commit(store: &StagingStore) -> Result<usize, ReplaceError> {
    // Collect first: the tree is mutated while moving
    let marker = store.marker_path();
    let staged: Vec<_> = FileWalker::new(&[])?
        .walk_files(store.root())?
        .into_iter()
        .filter(|path| *path != marker)
        .collect();

    for src in &staged {
        let rel = src.strip_prefix(store.root()).map_err(|_| ReplaceError::Commit {
            path: src.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "outside staging root"),
        })?;
        let dest = store.target_root().join(rel);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| ReplaceError::Commit {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        move_file(src, &dest).map_err(|source| ReplaceError::Commit {
            path: dest.clone(),
            source,
        })?;
        debug!(file = %dest.display(), "committed");
    }

    info!(files = staged.len(), "commit complete");
    Ok(staged.len())
}

/// Rename, or copy + remove when the rename crosses devices.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(file = %dest.display(), "cross-device move, copying");
            fs::copy(src, dest)?;
            fs::remove_file(src)
        }
        other => other,
    }
}
