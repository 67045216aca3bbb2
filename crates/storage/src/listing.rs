//! Staging directory listing.

use crate::error::{ErrorKind, Result};
use std::fs;
use std::path::Path;

/// Names of files the operating system drops into directories on its own.
const METADATA_ARTIFACTS: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];

/// Returns `true` for OS-generated metadata entries that are never staged media.
pub fn is_metadata_artifact(name: &str) -> bool {
    // AppleDouble resource forks: "._Movie.mkv"
    METADATA_ARTIFACTS.contains(&name) || name.starts_with("._")
}

/// Lists the entry names directly inside `dir`, sorted, excluding metadata
/// artifacts.
///
/// The order is stable for a given directory snapshot, which keeps a run
/// reproducible. Names that are not valid UTF-8 are converted lossily and
/// logged, because they cannot round-trip through the active-download set.
pub fn list_staged(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| ErrorKind::from_io(e, dir))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ErrorKind::from_io(e, dir))?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::warn!(name = ?raw, "Staged entry name is not valid UTF-8");
                raw.to_string_lossy().into_owned()
            },
        };
        if is_metadata_artifact(&name) {
            tracing::trace!(name = %name, "Skipping filesystem metadata artifact");
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}
