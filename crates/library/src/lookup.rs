//! Whether a staged object already has a copy in the archive.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use sweep_storage::{SizeComparison, base_name, compare, join_name};

/// What the size comparison is measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompareMode {
    /// Compare the staged object with the archive copy.
    #[default]
    Staged,
    /// Compare the archive copy with itself. Sizes are then always equal, so
    /// any existing copy sends the staged object to the graveyard. Kept for
    /// installations that relied on that behaviour.
    Legacy,
}
impl CompareMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Legacy => "legacy",
        }
    }
}
impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for CompareMode {
    type Err = ErrorKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staged" => Ok(Self::Staged),
            "legacy" => Ok(Self::Legacy),
            other => Err(ErrorKind::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveExistence {
    Absent,
    Present(SizeComparison),
}

/// Checks `archive_dir` for an object with the same base name as `staged`
/// and, when one exists, compares their sizes.
///
/// # Errors
/// [`ErrorKind::Lookup`] when the base name is not a plain entry name, or an
/// entry cannot be measured, or the two objects are of different kinds.
pub fn lookup(archive_dir: &Path, staged: &Path, mode: CompareMode) -> Result<ArchiveExistence> {
    let name = base_name(staged);
    let archived = join_name(archive_dir, &name).or_raise(|| ErrorKind::Lookup(name.clone()))?;
    if std::fs::symlink_metadata(&archived).is_err() {
        return Ok(ArchiveExistence::Absent);
    }
    let source = match mode {
        CompareMode::Staged => staged,
        CompareMode::Legacy => archived.as_path(),
    };
    let comparison = compare(source, &archived).or_raise(|| ErrorKind::Lookup(name.clone()))?;
    tracing::debug!(
        name = %name,
        source_size = comparison.source_size,
        dest_size = comparison.dest_size,
        action = comparison.action.as_str(),
        "Found archive copy"
    );
    Ok(ArchiveExistence::Present(comparison))
}
