//! Object classification.

use std::fmt;
use std::fs;
use std::path::Path;

/// The kind of a staged filesystem object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Directory,
    Symlink,
}
impl ObjectKind {
    /// Inspects `path` without following symlinks.
    ///
    /// Returns `None` for entries that are none of the three kinds (sockets,
    /// FIFOs, devices) and for entries that cannot be inspected at all.
    pub fn of(path: impl AsRef<Path>) -> Option<Self> {
        let file_type = fs::symlink_metadata(path).ok()?.file_type();
        // Symlink first: a link to a directory must never be treated as one.
        if file_type.is_symlink() {
            Some(Self::Symlink)
        } else if file_type.is_file() {
            Some(Self::File)
        } else if file_type.is_dir() {
            Some(Self::Directory)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }
}
impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition of candidate names by [`ObjectKind`].
///
/// Every input name lands in exactly one bucket; names that are not a file,
/// directory or symlink (or vanished before inspection) go to `other`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub files: Vec<String>,
    pub directories: Vec<String>,
    pub symlinks: Vec<String>,
    pub other: Vec<String>,
}
impl Classification {
    /// Kind assigned to `name`, if it was classified as one of the three kinds.
    pub fn kind_of(&self, name: &str) -> Option<ObjectKind> {
        let contains = |bucket: &[String]| bucket.iter().any(|n| n == name);
        if contains(&self.symlinks) {
            Some(ObjectKind::Symlink)
        } else if contains(&self.files) {
            Some(ObjectKind::File)
        } else if contains(&self.directories) {
            Some(ObjectKind::Directory)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len() + self.symlinks.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies each of `names` as found directly inside `dir`, preserving the
/// input order within each bucket.
pub fn classify<S: AsRef<str>>(dir: impl AsRef<Path>, names: impl IntoIterator<Item = S>) -> Classification {
    let dir = dir.as_ref();
    let mut classification = Classification::default();
    for name in names {
        let name = name.as_ref();
        let bucket = match ObjectKind::of(dir.join(name)) {
            Some(ObjectKind::Symlink) => &mut classification.symlinks,
            Some(ObjectKind::File) => &mut classification.files,
            Some(ObjectKind::Directory) => &mut classification.directories,
            None => &mut classification.other,
        };
        bucket.push(name.to_string());
    }
    classification
}
