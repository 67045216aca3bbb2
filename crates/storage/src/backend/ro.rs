//! Read-only filesystem backend.
//!
//! Wraps another backend and prevents mutating operations from executing,
//! while still reporting what would have happened. Used for dry runs.

use crate::backend::{Filesystem, FsHandle};
use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Read-only filesystem backend.
///
/// Silently drops all mutating operations, logging an
/// [`info event`](tracing::Event) instead. Preconditions that can be checked
/// without touching the disk (the source exists, the destination directory
/// exists and has a free slot) are still checked, so a dry run reports the
/// failures a real run would hit.
#[derive(Clone)]
pub struct ReadOnlyFilesystem {
    inner: FsHandle,
}
impl ReadOnlyFilesystem {
    pub fn new(inner: FsHandle) -> Self {
        Self { inner }
    }
}

impl Filesystem for ReadOnlyFilesystem {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn move_into(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = source.file_name().ok_or_else(|| ErrorKind::InvalidPath(source.to_path_buf()))?;
        std::fs::symlink_metadata(source).map_err(|e| ErrorKind::from_io(e, source))?;
        if !dest_dir.is_dir() {
            exn::bail!(ErrorKind::NotFound(dest_dir.to_path_buf()));
        }
        let target = dest_dir.join(name);
        if std::fs::symlink_metadata(&target).is_ok() {
            exn::bail!(ErrorKind::AlreadyExists(target));
        }
        tracing::info!(source = %source.display(), target = %target.display(), "Skipping move during read-only mode");
        Ok(target)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), "Skipping delete during read-only mode");
        Ok(())
    }

    fn unlink(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping unlink during read-only mode");
        Ok(())
    }
}
