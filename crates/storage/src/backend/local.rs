//! Local filesystem backend.

use crate::backend::Filesystem;
use crate::error::{ErrorKind, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Performs moves and deletions directly on the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    /// Recursively copies `from` to `to`, recreating symlinks rather than
    /// following them. `to` must not exist.
    fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
        let file_type = fs::symlink_metadata(from)?.file_type();
        if file_type.is_symlink() {
            return Self::copy_symlink(from, to);
        }
        if file_type.is_file() {
            return fs::copy(from, to).map(|_| ());
        }
        fs::create_dir(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            Self::copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    }

    #[cfg(unix)]
    fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(fs::read_link(from)?, to)
    }

    #[cfg(not(unix))]
    fn copy_symlink(from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot copy symlink {} across devices", from.display()),
        ))
    }

    fn remove_any(path: &Path) -> io::Result<()> {
        match fs::symlink_metadata(path)?.is_dir() {
            true => fs::remove_dir_all(path),
            false => fs::remove_file(path),
        }
    }

    /// Copy-then-delete for renames that cross a filesystem boundary.
    fn move_across_devices(source: &Path, target: &Path) -> Result<()> {
        tracing::debug!(source = %source.display(), target = %target.display(), "Rename crosses devices; copying");
        if let Err(e) = Self::copy_recursive(source, target) {
            // Never leave a half-copied object behind in the destination.
            if let Err(cleanup) = Self::remove_any(target)
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                tracing::warn!(target = %target.display(), error = %cleanup, "Failed to remove partial copy");
            }
            exn::bail!(ErrorKind::from_io(e, target));
        }
        Self::remove_any(source).map_err(|e| ErrorKind::from_io(e, source))?;
        Ok(())
    }
}

impl Filesystem for LocalFilesystem {
    fn name(&self) -> &str {
        "local"
    }

    fn move_into(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = source.file_name().ok_or_else(|| ErrorKind::InvalidPath(source.to_path_buf()))?;
        let dest_meta = fs::metadata(dest_dir).map_err(|e| ErrorKind::from_io(e, dest_dir))?;
        if !dest_meta.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(dest_dir.to_path_buf()));
        }
        let target = dest_dir.join(name);
        // Broken symlinks count as occupying the slot, hence symlink_metadata.
        match fs::symlink_metadata(&target) {
            Ok(_) => exn::bail!(ErrorKind::AlreadyExists(target)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => exn::bail!(ErrorKind::from_io(e, &target)),
        }
        match fs::rename(source, &target) {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                Self::move_across_devices(source, &target)?;
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, source)),
        }
        Ok(target)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(path).map_err(|e| ErrorKind::from_io(e, path))?)
    }

    fn unlink(&self, path: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path).map_err(|e| ErrorKind::from_io(e, path))?;
        if !metadata.file_type().is_symlink() {
            exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
        }
        Ok(fs::remove_file(path).map_err(|e| ErrorKind::from_io(e, path))?)
    }
}
