//! Entry name validation.
//!
//! Staged objects are addressed by their name inside a role directory
//! (staging, archive, graveyard, trash). A name must therefore be exactly one
//! plain path component: joining it onto a directory may never escape that
//! directory or point somewhere deeper inside it.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates that `name` is a single normal path component and returns it.
///
/// Trailing separators and `.` components are tolerated (they resolve to the
/// same entry), anything else that would change the directory is rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sweep_storage::validate_name;
/// // Valid names
/// assert!(validate_name("Movie.2024.1080p").is_ok());
/// assert_eq!(validate_name("./Movie/").unwrap(), Path::new("Movie"));
/// // Invalid names
/// assert!(validate_name("../etc").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("/abs").is_err());
/// assert!(validate_name("a\0b").is_err());
/// ```
pub fn validate(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let mut found = None;
    for component in name.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) || found.is_some() {
                    exn::bail!(ErrorKind::InvalidPath(name.to_path_buf()));
                }
                found = Some(s);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                exn::bail!(ErrorKind::InvalidPath(name.to_path_buf()))
            },
        }
    }
    match found {
        Some(s) => Ok(PathBuf::from(s)),
        None => exn::bail!(ErrorKind::InvalidPath(name.to_path_buf())),
    }
}

/// Joins a validated entry name onto a role directory.
pub fn join(dir: impl AsRef<Path>, name: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(dir.as_ref().join(validate(name)?))
}

/// Base name of a path as an owned string, for reporting.
pub fn base_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Movie", "Movie")]
    #[case("Movie.2024.mkv", "Movie.2024.mkv")]
    #[case("Movie/", "Movie")]
    #[case("./Movie", "Movie")]
    #[case("Some Show S01 [1080p]", "Some Show S01 [1080p]")]
    fn test_valid_names(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../Movie")]
    #[case("a/b")]
    #[case("/Movie")]
    #[case("a\0b")]
    fn test_invalid_names(#[case] input: &str) {
        assert!(validate(input).is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/archive", "Movie").unwrap(), Path::new("/archive/Movie"));
        assert!(join("/archive", "../Movie").is_err());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/staging/Movie A")), "Movie A");
        assert_eq!(base_name(Path::new("/")), "");
    }
}
