//! Reconciliation of a download staging directory.
//!
//! Every object in the staging directory that is no longer being downloaded
//! is disposed of exactly once per pass:
//!
//! - symlinks are removed,
//! - files are moved to the archive, or to the graveyard when the archive
//!   already holds a copy at least as large,
//! - directories are first [scrubbed](sweep_archive::Scrubber) of extracted
//!   archive members and then treated like files.
//!
//! A failed graveyard move is salvaged into the trash, but still counts as a
//! failure. The entry point is [`reconcile`]; [`dispose`] handles one object.

mod dispose;
pub mod error;
mod failures;
mod lookup;
mod reconcile;
mod source;

pub use crate::dispose::{Action, Disposition, MoveReport, Outcome, StagedObject, dispose};
pub use crate::failures::{Failure, Failures};
pub use crate::lookup::{ArchiveExistence, CompareMode, lookup};
pub use crate::reconcile::{IdleReason, ReconcileEvent, RunOutcome, RunReport, reconcile};
pub use crate::source::{ActiveDownloads, StaticSource};
use std::path::{Path, PathBuf};
use sweep_archive::Scrubber;
use sweep_storage::{FsHandle, Role};

/// Suffix appended to every directory when running against a development tree.
pub const DEV_SUFFIX: &str = "__DEV";

/// The four directories a pass works with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directories {
    pub staging: PathBuf,
    pub archive: PathBuf,
    pub graveyard: PathBuf,
    pub trash: PathBuf,
}
impl Directories {
    /// The destination directory for moves labelled `role`.
    pub fn for_role(&self, role: Role) -> &Path {
        match role {
            Role::Archive => &self.archive,
            Role::Graveyard => &self.graveyard,
            Role::Trash => &self.trash,
        }
    }

    /// Appends `suffix` to the final component of every directory.
    ///
    /// `/media/Archive` becomes `/media/Archive__DEV` for [`DEV_SUFFIX`].
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let suffixed = |path: &Path| {
            let mut path = path.as_os_str().to_owned();
            path.push(suffix);
            PathBuf::from(path)
        };
        Self {
            staging: suffixed(&self.staging),
            archive: suffixed(&self.archive),
            graveyard: suffixed(&self.graveyard),
            trash: suffixed(&self.trash),
        }
    }
}

/// Everything a pass needs, built once by the caller.
pub struct Context {
    pub directories: Directories,
    pub scrubber: Scrubber,
    /// Every mutation goes through this handle; swap in a
    /// [`ReadOnlyFilesystem`](sweep_storage::ReadOnlyFilesystem) for dry runs.
    pub fs: FsHandle,
    pub compare: CompareMode,
    /// Go on with the pass when nothing is downloading, instead of ending it
    /// as [`IdleReason::NoActiveDownloads`].
    pub proceed_when_idle: bool,
}
