use crate::Context;
use crate::dispose::{Disposition, StagedObject, dispose};
use crate::error::{ErrorKind, Result};
use crate::failures::Failures;
use exn::ResultExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use sweep_storage::{Classification, classify, list_staged};

/// Progress events emitted by [`reconcile`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, unless the pass has nothing
///    to do.
/// 2. [`Classified`](Self::Classified): exactly once.
/// 3. [`Disposed`](Self::Disposed): once per processed object.
/// 4. [`Complete`](Self::Complete): exactly once.
#[derive(Clone, Debug)]
pub enum ReconcileEvent<'a> {
    Started { staged: usize, active: usize, candidates: usize },
    Classified(&'a Classification),
    /// `position` is 1-based.
    Disposed { position: usize, total: usize, disposition: &'a Disposition },
    Complete(&'a RunReport),
}

/// Why a pass ended without touching anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleReason {
    /// The staging directory is empty.
    EmptyStaging,
    /// Nothing is downloading.
    NoActiveDownloads,
    /// Every staged object is still downloading.
    AllActive,
}
impl IdleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyStaging => "staging directory is empty",
            Self::NoActiveDownloads => "no active downloads",
            Self::AllActive => "every staged object is still downloading",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub candidates: usize,
    pub dispositions: Vec<Disposition>,
    pub failures: Failures,
    /// The stop flag was raised before every candidate was processed.
    pub interrupted: bool,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub enum RunOutcome {
    NothingToDo(IdleReason),
    Completed(RunReport),
}

/// Runs one reconciliation pass over the staging directory.
///
/// Candidates are the staged entries (sorted by name) minus the names in
/// `active`. Each is disposed of in order, one at a time. `stop` is checked
/// between objects; once raised, the remaining candidates are left untouched
/// and the report is marked as interrupted.
///
/// # Errors
/// [`ErrorKind::Listing`] when the staging directory cannot be listed. No
/// per-object problem is an error; see [`Disposition`].
pub fn reconcile(
    ctx: &Context,
    active: &HashSet<String>,
    stop: &AtomicBool,
    mut on_event: impl FnMut(ReconcileEvent<'_>),
) -> Result<RunOutcome> {
    let started = Instant::now();
    let staging = &ctx.directories.staging;

    if active.is_empty() && !ctx.proceed_when_idle {
        tracing::info!("No active downloads; stopping");
        return Ok(RunOutcome::NothingToDo(IdleReason::NoActiveDownloads));
    }

    let staged = list_staged(staging).or_raise(|| ErrorKind::Listing(staging.clone()))?;
    if staged.is_empty() {
        tracing::info!(staging = %staging.display(), "Nothing staged");
        return Ok(RunOutcome::NothingToDo(IdleReason::EmptyStaging));
    }
    let candidates: Vec<String> = staged.iter().filter(|name| !active.contains(*name)).cloned().collect();
    tracing::info!(staged = staged.len(), active = active.len(), candidates = candidates.len(), "Computed candidates");
    if candidates.is_empty() {
        return Ok(RunOutcome::NothingToDo(IdleReason::AllActive));
    }
    on_event(ReconcileEvent::Started { staged: staged.len(), active: active.len(), candidates: candidates.len() });

    let classification = classify(staging, &candidates);
    tracing::info!(
        symlinks = classification.symlinks.len(),
        files = classification.files.len(),
        directories = classification.directories.len(),
        other = classification.other.len(),
        "Classified candidates"
    );
    on_event(ReconcileEvent::Classified(&classification));

    let total = candidates.len();
    let mut report = RunReport { candidates: total, ..RunReport::default() };
    for (index, name) in candidates.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            tracing::warn!(remaining = total - index, "Interrupted; leaving remaining objects in place");
            report.interrupted = true;
            break;
        }
        let Some(kind) = classification.kind_of(name) else {
            tracing::warn!(name = %name, "Not a file, directory or symlink; skipping");
            report.failures.push(None, name.clone());
            continue;
        };
        let object = StagedObject { name: name.clone(), path: staging.join(name), kind };
        tracing::info!(position = index + 1, total, name = %name, "Processing object");
        let disposition = dispose(ctx, &object);
        if !disposition.is_success() {
            report.failures.push(Some(kind), name.clone());
        }
        on_event(ReconcileEvent::Disposed { position: index + 1, total, disposition: &disposition });
        report.dispositions.push(disposition);
    }

    report.elapsed = started.elapsed();
    tracing::info!(
        processed = report.dispositions.len(),
        failed = report.failures.len(),
        elapsed = ?report.elapsed,
        "Reconciliation complete"
    );
    on_event(ReconcileEvent::Complete(&report));
    Ok(RunOutcome::Completed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Action;
    use crate::{CompareMode, Directories};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use sweep_archive::{ArchiveLister, Scrubber};
    use sweep_storage::{FsHandle, LocalFilesystem, ObjectKind, ReadOnlyFilesystem};

    struct CannedLister(Vec<&'static str>);
    impl ArchiveLister for CannedLister {
        fn list(&self, _archive: &Path) -> sweep_archive::error::Result<String> {
            let rule = "------------------- ----- ------------ ------------  ------------------------";
            let rows: String = self
                .0
                .iter()
                .map(|m| format!("2024-01-15 20:31:02 ....A         1024         1024  {m}\n"))
                .collect();
            Ok(format!("{rule}\n{rows}{rule}\n"))
        }
    }

    fn context(root: &Path, fs: FsHandle, members: Vec<&'static str>) -> Context {
        let directories = Directories {
            staging: root.join("staging"),
            archive: root.join("archive"),
            graveyard: root.join("graveyard"),
            trash: root.join("trash"),
        };
        for dir in [&directories.staging, &directories.archive, &directories.graveyard, &directories.trash] {
            fs::create_dir_all(dir).unwrap();
        }
        Context {
            directories,
            scrubber: Scrubber::new(Arc::new(CannedLister(members)), fs.clone()),
            fs,
            compare: CompareMode::Staged,
            proceed_when_idle: false,
        }
    }

    fn local() -> FsHandle {
        Arc::new(LocalFilesystem::new())
    }

    fn active(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::NothingToDo(reason) => panic!("expected a completed run, got {reason:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_movie_and_broken_link_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec!["MovieA.mkv"]);
        let staging = &ctx.directories.staging;
        fs::create_dir(staging.join("MovieA")).unwrap();
        fs::write(staging.join("MovieA/MovieA.rar"), b"rar").unwrap();
        fs::write(staging.join("MovieA/MovieA.mkv"), b"video").unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", staging.join("BrokenLink")).unwrap();
        fs::write(staging.join("Downloading.mkv"), b"partial").unwrap();

        let mut events = Vec::new();
        let outcome = reconcile(&ctx, &active(&["Downloading.mkv"]), &AtomicBool::new(false), |event| {
            events.push(match event {
                ReconcileEvent::Started { candidates, .. } => format!("started {candidates}"),
                ReconcileEvent::Classified(c) => format!("classified {}", c.len()),
                ReconcileEvent::Disposed { position, disposition, .. } => format!("{position} {}", disposition.name),
                ReconcileEvent::Complete(_) => "complete".to_string(),
            })
        })
        .unwrap();
        let report = completed(outcome);

        assert_eq!(events, vec!["started 2", "classified 2", "1 BrokenLink", "2 MovieA", "complete"]);
        assert!(report.failures.is_empty());
        assert_eq!(report.dispositions[0].action, Action::Unlinked);
        assert_eq!(report.dispositions[1].action, Action::Archived(ctx.directories.archive.join("MovieA")));
        assert!(ctx.directories.archive.join("MovieA/MovieA.rar").exists());
        assert!(!ctx.directories.archive.join("MovieA/MovieA.mkv").exists());
        assert!(staging.join("Downloading.mkv").exists());
        assert!(fs::symlink_metadata(staging.join("BrokenLink")).is_err());
    }

    #[test]
    fn test_second_pass_has_nothing_to_do() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        fs::write(ctx.directories.staging.join("MovieB.mkv"), b"video").unwrap();

        let stop = AtomicBool::new(false);
        let first = completed(reconcile(&ctx, &active(&["Elsewhere"]), &stop, |_| {}).unwrap());
        assert_eq!(first.dispositions.len(), 1);
        let second = reconcile(&ctx, &active(&["Elsewhere"]), &stop, |_| {}).unwrap();
        assert!(matches!(second, RunOutcome::NothingToDo(IdleReason::EmptyStaging)));
    }

    #[test]
    fn test_all_active() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        fs::write(ctx.directories.staging.join("MovieB.mkv"), b"video").unwrap();
        let outcome = reconcile(&ctx, &active(&["MovieB.mkv"]), &AtomicBool::new(false), |_| {}).unwrap();
        assert!(matches!(outcome, RunOutcome::NothingToDo(IdleReason::AllActive)));
        assert!(ctx.directories.staging.join("MovieB.mkv").exists());
    }

    #[test]
    fn test_no_active_downloads_stops_cleanly() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        fs::write(ctx.directories.staging.join("MovieB.mkv"), b"video").unwrap();
        let mut events = 0;
        let outcome = reconcile(&ctx, &active(&[]), &AtomicBool::new(false), |_| events += 1).unwrap();
        assert!(matches!(outcome, RunOutcome::NothingToDo(IdleReason::NoActiveDownloads)));
        assert_eq!(events, 0);
        assert!(ctx.directories.staging.join("MovieB.mkv").exists());
        assert!(!ctx.directories.archive.join("MovieB.mkv").exists());
    }

    #[test]
    fn test_proceed_when_idle() {
        let temp = tempfile::tempdir().unwrap();
        let mut ctx = context(temp.path(), local(), vec![]);
        ctx.proceed_when_idle = true;
        fs::write(ctx.directories.staging.join("MovieB.mkv"), b"video").unwrap();
        let report = completed(reconcile(&ctx, &active(&[]), &AtomicBool::new(false), |_| {}).unwrap());
        assert_eq!(report.dispositions.len(), 1);
        assert!(ctx.directories.archive.join("MovieB.mkv").exists());
    }

    #[test]
    fn test_failures_are_aggregated_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        let staging = &ctx.directories.staging;
        // Both already in the archive with a smaller copy, so the archive move is refused.
        for name in ["a.mkv", "b.mkv"] {
            fs::write(staging.join(name), vec![0u8; 8]).unwrap();
            fs::write(ctx.directories.archive.join(name), vec![0u8; 2]).unwrap();
        }
        fs::write(staging.join("c.mkv"), b"fine").unwrap();

        let report = completed(reconcile(&ctx, &active(&["Elsewhere"]), &AtomicBool::new(false), |_| {}).unwrap());
        let failed: Vec<(Option<ObjectKind>, &str)> =
            report.failures.iter().map(|f| (f.kind, f.name.as_str())).collect();
        assert_eq!(failed, vec![(Some(ObjectKind::File), "a.mkv"), (Some(ObjectKind::File), "b.mkv")]);
        assert!(ctx.directories.archive.join("c.mkv").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_is_recorded_as_other_failure() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        let staging = &ctx.directories.staging;
        let status = std::process::Command::new("mkfifo").arg(staging.join("pipe")).status().unwrap();
        assert!(status.success());
        fs::write(staging.join("MovieB.mkv"), b"video").unwrap();

        let mut classified_other = Vec::new();
        let outcome = reconcile(&ctx, &active(&["Elsewhere"]), &AtomicBool::new(false), |event| {
            if let ReconcileEvent::Classified(c) = event {
                classified_other = c.other.clone();
            }
        })
        .unwrap();
        let report = completed(outcome);

        assert_eq!(classified_other, vec!["pipe".to_string()]);
        let failed: Vec<(Option<ObjectKind>, &str)> =
            report.failures.iter().map(|f| (f.kind, f.name.as_str())).collect();
        assert_eq!(failed, vec![(None, "pipe")]);
        assert_eq!(report.dispositions.len(), 1);
        assert!(fs::symlink_metadata(staging.join("pipe")).is_ok());
        assert!(ctx.directories.archive.join("MovieB.mkv").exists());
    }

    #[test]
    fn test_stop_flag_leaves_remaining_objects() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        for name in ["a.mkv", "b.mkv", "c.mkv"] {
            fs::write(ctx.directories.staging.join(name), b"video").unwrap();
        }
        let stop = AtomicBool::new(false);
        let outcome = reconcile(&ctx, &active(&["Elsewhere"]), &stop, |event| {
            if let ReconcileEvent::Disposed { position: 1, .. } = event {
                stop.store(true, Ordering::SeqCst);
            }
        })
        .unwrap();
        let report = completed(outcome);
        assert!(report.interrupted);
        assert_eq!(report.dispositions.len(), 1);
        assert!(ctx.directories.staging.join("b.mkv").exists());
        assert!(ctx.directories.staging.join("c.mkv").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let fs_handle: FsHandle = Arc::new(ReadOnlyFilesystem::new(local()));
        let ctx = context(temp.path(), fs_handle, vec!["MovieA.mkv"]);
        let staging = &ctx.directories.staging;
        fs::create_dir(staging.join("MovieA")).unwrap();
        fs::write(staging.join("MovieA/MovieA.rar"), b"rar").unwrap();
        fs::write(staging.join("MovieA/MovieA.mkv"), b"video").unwrap();

        let report = completed(reconcile(&ctx, &active(&["Elsewhere"]), &AtomicBool::new(false), |_| {}).unwrap());
        assert!(report.failures.is_empty());
        assert!(staging.join("MovieA/MovieA.mkv").exists());
        assert!(!ctx.directories.archive.join("MovieA").exists());
    }

    #[test]
    fn test_unreadable_staging_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), local(), vec![]);
        fs::remove_dir(&ctx.directories.staging).unwrap();
        let err = reconcile(&ctx, &active(&["Elsewhere"]), &AtomicBool::new(false), |_| {}).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Listing(_)));
    }
}
