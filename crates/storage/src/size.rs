//! Size measurement and size-based duplicate arbitration.

use crate::error::{ErrorKind, Result};
use crate::path::base_name;
use std::fs;
use std::path::Path;

/// What kind of object a [`SizeComparison`] measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeasuredKind {
    File,
    Dir,
}
impl MeasuredKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
        }
    }
}

/// Where a candidate should go once a same-named copy is known to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeAction {
    /// The candidate is strictly larger than the existing copy; it replaces it.
    Archive,
    /// The candidate is no larger than the existing copy.
    Graveyard,
}
impl SizeAction {
    /// Ties favour the graveyard: an equal-sized candidate is not an upgrade.
    pub fn decide(source_size: u64, dest_size: u64) -> Self {
        if dest_size < source_size { Self::Archive } else { Self::Graveyard }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Graveyard => "graveyard",
        }
    }
}

/// Result of measuring a candidate against an existing destination copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeComparison {
    pub name: String,
    pub kind: MeasuredKind,
    pub source_size: u64,
    pub dest_size: u64,
    pub action: SizeAction,
}

/// Byte size of a single file.
pub fn file_size(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|e| ErrorKind::from_io(e, path))?;
    Ok(metadata.len())
}

/// Recursive sum of the sizes of all regular files below `root`.
///
/// Symlinks are neither followed nor counted, so the walk never leaves
/// `root`. Any entry that cannot be read aborts the measurement: a partial
/// total would make the comparison meaningless.
pub fn directory_size(root: impl AsRef<Path>) -> Result<u64> {
    let mut total: u64 = 0;
    let mut stack = vec![root.as_ref().to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current).map_err(|e| ErrorKind::from_io(e, &current))?;
        for entry in entries {
            let entry = entry.map_err(|e| ErrorKind::from_io(e, &current))?;
            let path = entry.path();
            // DirEntry::file_type() does not traverse symlinks.
            let file_type = entry.file_type().map_err(|e| ErrorKind::from_io(e, &path))?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| ErrorKind::from_io(e, &path))?;
                total = total.saturating_add(metadata.len());
            }
        }
    }
    Ok(total)
}

/// Measures `source` and `dest` the same way and decides between archive and
/// graveyard.
///
/// The kind is taken from `source`. A destination of a different kind cannot
/// be measured meaningfully and is reported as [`ErrorKind::KindMismatch`].
pub fn compare(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<SizeComparison> {
    let (source, dest) = (source.as_ref(), dest.as_ref());
    let source_meta = fs::metadata(source).map_err(|e| ErrorKind::from_io(e, source))?;
    let dest_meta = fs::metadata(dest).map_err(|e| ErrorKind::from_io(e, dest))?;
    let kind = if source_meta.is_file() { MeasuredKind::File } else { MeasuredKind::Dir };
    let (source_size, dest_size) = match kind {
        MeasuredKind::File if dest_meta.is_file() => (source_meta.len(), dest_meta.len()),
        MeasuredKind::Dir if dest_meta.is_dir() => (directory_size(source)?, directory_size(dest)?),
        _ => exn::bail!(ErrorKind::KindMismatch(source.to_path_buf(), dest.to_path_buf())),
    };
    let comparison = SizeComparison {
        name: base_name(source),
        kind,
        source_size,
        dest_size,
        action: SizeAction::decide(source_size, dest_size),
    };
    tracing::debug!(
        name = %comparison.name,
        kind = comparison.kind.as_str(),
        source_size,
        dest_size,
        action = comparison.action.as_str(),
        "Compared sizes"
    );
    Ok(comparison)
}
