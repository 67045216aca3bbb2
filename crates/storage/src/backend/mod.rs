//! Filesystem mutation backends.
//!
//! Everything that changes the disk during a reconciliation pass goes through
//! the [`Filesystem`] trait: moving staged objects between role directories,
//! deleting scrubbed files and removing symlinks. Reads (sizing, listing,
//! classification) are plain functions elsewhere in this crate.
//!
//! Two implementations exist: [`LocalFilesystem`] performs the operations and
//! [`ReadOnlyFilesystem`] wraps another backend and only logs them, which is
//! how dry runs are implemented.

mod local;
mod ro;

pub use self::local::LocalFilesystem;
pub use self::ro::ReadOnlyFilesystem;
use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// The role of a destination directory.
///
/// Only used to label messages; the role never influences what a move does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Archive,
    Graveyard,
    Trash,
}
impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Archive => "Archive",
            Self::Graveyard => "Graveyard",
            Self::Trash => "Trash",
        }
    }
}
impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Disk-mutating operations used by the disposition engine.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use sweep_storage::{Filesystem, LocalFilesystem};
///
/// # fn example() -> sweep_storage::error::Result<()> {
/// let fs = LocalFilesystem::new();
/// let moved_to = fs.move_into(Path::new("/staging/Movie"), Path::new("/archive"))?;
/// assert_eq!(moved_to, Path::new("/archive/Movie"));
/// # Ok(())
/// # }
/// ```
pub trait Filesystem: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Moves `source` (file or directory) into the existing directory
    /// `dest_dir`, keeping its base name, and returns the new path.
    ///
    /// # Notes
    /// - `dest_dir` must already exist; it is never created.
    /// - An object already at the target path is never overwritten;
    ///   [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) is returned instead.
    /// - Moves across filesystems fall back to copy-then-delete.
    fn move_into(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf>;

    /// Deletes a regular file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist, so callers can tell "already gone" from real failures.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Removes a symlink itself (never its target). Broken links are fine.
    fn unlink(&self, path: &Path) -> Result<()>;
}

/// Shared handle to a filesystem backend.
pub type FsHandle = std::sync::Arc<dyn Filesystem>;
