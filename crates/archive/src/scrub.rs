//! The scrub decision for one staged directory.

use crate::error::{ErrorKind, Result};
use crate::lister::ListerHandle;
use crate::members::{Members, classify_members, has_extension, parse_listing};
use exn::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};
use sweep_storage::FsHandle;
use sweep_storage::error::ErrorKind as StorageErrorKind;
use tracing::instrument;

pub const DEFAULT_EXTENSION: &str = "rar";

/// Outcome of scrubbing a staged directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrubStatus {
    /// Nothing to scrub, or the extracted copy was deleted.
    Success,
    /// No single extracted member could be identified; the directory must be
    /// left alone.
    Warning,
    /// The archive could not be listed or the extracted copy not deleted.
    Failed,
    /// The extracted copy vanished between listing and deletion.
    Missing,
}
impl ScrubStatus {
    /// Whether the disposition engine may go on to move the directory.
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Success | Self::Missing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Missing => "missing",
        }
    }
}
impl fmt::Display for ScrubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrubReport {
    /// The archive that was inspected, if the directory had one.
    pub archive: Option<PathBuf>,
    /// The member selected for deletion; empty when none was.
    pub scrub_file: String,
    pub status: ScrubStatus,
    pub response: String,
}
impl ScrubReport {
    fn new(archive: Option<PathBuf>, scrub_file: impl Into<String>, status: ScrubStatus, response: impl Into<String>) -> Self {
        Self { archive, scrub_file: scrub_file.into(), status, response: response.into() }
    }
}

/// Removes the extracted copy of an archive's single media member from a
/// staged directory, so only the archive itself is kept.
#[derive(Clone)]
pub struct Scrubber {
    lister: ListerHandle,
    fs: FsHandle,
    extension: String,
}
impl Scrubber {
    pub fn new(lister: ListerHandle, fs: FsHandle) -> Self {
        Self { lister, fs, extension: DEFAULT_EXTENSION.to_string() }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Finds the archive inside `dir`.
    ///
    /// For multi-volume sets the first volume (`.part1.rar`, `.part01.rar`,
    /// ...) is preferred; otherwise the lexicographically first candidate is
    /// returned.
    pub fn find_archive(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let entries = std::fs::read_dir(dir).or_raise(|| ErrorKind::Unreadable(dir.to_path_buf()))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Unreadable(dir.to_path_buf()))?;
            let name = entry.file_name();
            if has_extension(&name, &self.extension) && entry.path().is_file() {
                candidates.push(name.to_string_lossy().into_owned());
            }
        }
        candidates.sort();
        let first = candidates.iter().find(|name| is_first_volume(name)).or_else(|| candidates.first());
        Ok(first.map(|name| dir.join(name)))
    }

    /// Lists the archive in `dir` (if any) and tags what it finds on disk.
    pub fn inspect(&self, dir: &Path) -> Result<(Option<PathBuf>, Members)> {
        let Some(archive) = self.find_archive(dir)? else {
            return Ok((None, Members::NoArchive));
        };
        let listing = self.lister.list(&archive)?;
        let listed = parse_listing(&listing);
        tracing::debug!(archive = %archive.display(), members = listed.len(), "Listed archive");
        Ok((Some(archive), classify_members(dir, listed, &self.extension)))
    }

    /// Scrubs `dir`. Never fails: every problem is folded into the report.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn scrub(&self, dir: &Path) -> ScrubReport {
        let (archive, members) = match self.inspect(dir) {
            Ok(inspection) => inspection,
            Err(err) => {
                tracing::warn!(error = %*err, "Could not inspect archive");
                return ScrubReport::new(None, "", ScrubStatus::Failed, (*err).to_string());
            },
        };
        match members {
            Members::NoArchive => ScrubReport::new(None, "", ScrubStatus::Success, "no archive found; continue"),
            Members::Missing(listed) => {
                tracing::warn!(?listed, "Archive lists no member present on disk; leaving directory alone");
                ScrubReport::new(
                    archive,
                    listed.join(", "),
                    ScrubStatus::Warning,
                    "no unpacked media file found; skip this object",
                )
            },
            Members::Multi(extracted) => {
                tracing::warn!(?extracted, "Multiple extracted members; leaving directory alone");
                ScrubReport::new(
                    archive,
                    extracted.join(", "),
                    ScrubStatus::Warning,
                    "found more than one media file; skip this object",
                )
            },
            Members::Single(member) => {
                let path = dir.join(&member);
                match self.fs.remove_file(&path) {
                    Ok(()) => {
                        tracing::info!(member = %member, "Deleted extracted copy");
                        ScrubReport::new(archive, member, ScrubStatus::Success, "deleted unpacked file")
                    },
                    Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {
                        ScrubReport::new(archive, member, ScrubStatus::Missing, "unpacked file missing; continue")
                    },
                    Err(err) => {
                        tracing::warn!(member = %member, error = %*err, "Could not delete extracted copy");
                        ScrubReport::new(archive, member, ScrubStatus::Failed, (*err).to_string())
                    },
                }
            },
        }
    }
}

/// `Movie.part1.rar`, `Movie.part01.rar`, `Movie.part001.rar`, ...
fn is_first_volume(name: &str) -> bool {
    let Some(stem) = Path::new(name).file_stem() else {
        return false;
    };
    let Some(volume) = Path::new(stem).extension().and_then(|v| v.to_str()) else {
        return false;
    };
    let volume = volume.to_ascii_lowercase();
    volume.strip_prefix("part").is_some_and(|n| n.trim_start_matches('0') == "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lister::ArchiveLister;
    use rstest::rstest;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use sweep_storage::{Filesystem, LocalFilesystem};

    /// Returns a listing naming `members`, and records which archive it was asked about.
    struct CannedLister {
        members: Vec<&'static str>,
        seen: Mutex<Vec<PathBuf>>,
    }
    impl CannedLister {
        fn new(members: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self { members, seen: Mutex::new(Vec::new()) })
        }
    }
    impl ArchiveLister for CannedLister {
        fn list(&self, archive: &Path) -> Result<String> {
            self.seen.lock().unwrap().push(archive.to_path_buf());
            let rule = "------------------- ----- ------------ ------------  ------------------------";
            let mut out = format!("   Date      Time    Attr         Size   Compressed  Name\n{rule}\n");
            for member in &self.members {
                out.push_str(&format!("2024-01-15 20:31:02 ....A         1024         1024  {member}\n"));
            }
            out.push_str(rule);
            out.push('\n');
            Ok(out)
        }
    }

    struct BrokenLister;
    impl ArchiveLister for BrokenLister {
        fn list(&self, _archive: &Path) -> Result<String> {
            exn::bail!(ErrorKind::ToolFailed(2, "Can not open the file as archive".to_string()));
        }
    }

    /// Reports every deletion as already gone.
    struct VanishingFilesystem;
    impl Filesystem for VanishingFilesystem {
        fn name(&self) -> &str {
            "vanishing"
        }
        fn move_into(&self, source: &Path, _dest_dir: &Path) -> sweep_storage::error::Result<PathBuf> {
            Ok(source.to_path_buf())
        }
        fn remove_file(&self, path: &Path) -> sweep_storage::error::Result<()> {
            exn::bail!(StorageErrorKind::NotFound(path.to_path_buf()));
        }
        fn unlink(&self, _path: &Path) -> sweep_storage::error::Result<()> {
            Ok(())
        }
    }

    fn scrubber(lister: ListerHandle) -> Scrubber {
        Scrubber::new(lister, Arc::new(LocalFilesystem::new()))
    }

    #[test]
    fn test_single_member_deleted() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieA.rar"), b"rar").unwrap();
        fs::write(temp.path().join("MovieA.mkv"), b"video").unwrap();

        let report = scrubber(CannedLister::new(vec!["MovieA.mkv"])).scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Success);
        assert_eq!(report.scrub_file, "MovieA.mkv");
        assert_eq!(report.archive, Some(temp.path().join("MovieA.rar")));
        assert!(!temp.path().join("MovieA.mkv").exists());
        assert!(temp.path().join("MovieA.rar").exists());
    }

    #[test]
    fn test_multiple_members_warns_and_keeps_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("Show.rar"), b"rar").unwrap();
        fs::write(temp.path().join("e01.mkv"), b"1").unwrap();
        fs::write(temp.path().join("e02.mkv"), b"2").unwrap();

        let report = scrubber(CannedLister::new(vec!["e01.mkv", "e02.mkv"])).scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Warning);
        assert!(!report.status.should_continue());
        assert_eq!(report.response, "found more than one media file; skip this object");
        assert!(temp.path().join("e01.mkv").exists());
        assert!(temp.path().join("e02.mkv").exists());
    }

    #[test]
    fn test_no_archive() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieA.mkv"), b"video").unwrap();
        let lister = CannedLister::new(vec!["MovieA.mkv"]);

        let report = scrubber(lister.clone()).scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Success);
        assert_eq!(report.scrub_file, "");
        assert_eq!(report.response, "no archive found; continue");
        assert!(lister.seen.lock().unwrap().is_empty());
        assert!(temp.path().join("MovieA.mkv").exists());
    }

    #[test]
    fn test_nothing_extracted_halts() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieC.rar"), b"rar").unwrap();
        let report = scrubber(CannedLister::new(vec!["MovieC.mkv"])).scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Warning);
        assert!(!report.status.should_continue());
        assert_eq!(report.scrub_file, "MovieC.mkv");
        assert_eq!(report.response, "no unpacked media file found; skip this object");
        assert!(temp.path().join("MovieC.rar").exists());
    }

    #[test]
    fn test_vanished_member_is_missing() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieA.rar"), b"rar").unwrap();
        fs::write(temp.path().join("MovieA.mkv"), b"video").unwrap();
        let scrubber = Scrubber::new(CannedLister::new(vec!["MovieA.mkv"]), Arc::new(VanishingFilesystem));

        let report = scrubber.scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Missing);
        assert!(report.status.should_continue());
        assert_eq!(report.scrub_file, "MovieA.mkv");
        assert_eq!(report.response, "unpacked file missing; continue");
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieA.rar"), b"rar").unwrap();
        let report = scrubber(Arc::new(BrokenLister)).scrub(temp.path());
        assert_eq!(report.status, ScrubStatus::Failed);
        assert!(report.response.contains("Can not open the file as archive"));
    }

    #[test]
    fn test_prefers_first_volume() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["Show.part02.rar", "Show.part01.rar", "Show.part10.rar", "Show.nfo"] {
            fs::write(temp.path().join(name), b"x").unwrap();
        }
        let found = scrubber(CannedLister::new(vec![])).find_archive(temp.path()).unwrap();
        assert_eq!(found, Some(temp.path().join("Show.part01.rar")));
    }

    #[test]
    fn test_custom_extension() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("MovieA.7z"), b"7z").unwrap();
        fs::write(temp.path().join("MovieA.rar"), b"rar").unwrap();
        let found = scrubber(CannedLister::new(vec![])).with_extension("7z").find_archive(temp.path()).unwrap();
        assert_eq!(found, Some(temp.path().join("MovieA.7z")));
    }

    #[rstest]
    #[case("Show.part1.rar", true)]
    #[case("Show.part01.rar", true)]
    #[case("Show.PART001.RAR", true)]
    #[case("Show.part10.rar", false)]
    #[case("Show.part02.rar", false)]
    #[case("Show.rar", false)]
    fn test_is_first_volume(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_first_volume(name), expected);
    }
}
