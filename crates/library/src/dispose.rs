use crate::Context;
use crate::lookup::{ArchiveExistence, lookup};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sweep_archive::ScrubReport;
use sweep_storage::{ObjectKind, Role, SizeAction};
use tracing::instrument;

/// An entry of the staging directory, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedObject {
    pub name: String,
    pub path: PathBuf,
    pub kind: ObjectKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
}
impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// What physically happened to a staged object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// The symlink was removed.
    Unlinked,
    /// Moved into the archive; carries the new path.
    Archived(PathBuf),
    /// Moved into the graveyard; carries the new path.
    Graveyarded(PathBuf),
    /// The graveyard move failed and the object went to the trash instead.
    Salvaged(PathBuf),
    /// Nothing was moved.
    LeftInPlace,
}

/// The result of one move attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReport {
    pub role: Role,
    pub result: Outcome,
    pub response: String,
    /// Where the object ended up, on success.
    pub target: Option<PathBuf>,
}

/// The final state of one staged object after a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disposition {
    pub name: String,
    pub kind: ObjectKind,
    pub outcome: Outcome,
    pub action: Action,
    /// Human-readable explanation, mostly useful on failure.
    pub detail: String,
    /// Present for directories only.
    pub scrub: Option<ScrubReport>,
    pub elapsed: Duration,
}
impl Disposition {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Decides and carries out what happens to `object`.
///
/// Never fails: every error is recorded in the returned [`Disposition`] and
/// logged as a warning.
#[instrument(skip_all, fields(name = %object.name, kind = %object.kind))]
pub fn dispose(ctx: &Context, object: &StagedObject) -> Disposition {
    let started = Instant::now();
    let mut scrub = None;
    let (outcome, action, detail) = match object.kind {
        ObjectKind::Symlink => unlink(ctx, &object.path),
        ObjectKind::File => relocate(ctx, object),
        ObjectKind::Directory => {
            let report = ctx.scrubber.scrub(&object.path);
            tracing::info!(status = report.status.as_str(), response = %report.response, "Scrubbed directory");
            let proceed = report.status.should_continue();
            let response = report.response.clone();
            scrub = Some(report);
            if proceed {
                relocate(ctx, object)
            } else {
                tracing::warn!(response = %response, "Leaving directory in place");
                (Outcome::Failed, Action::LeftInPlace, response)
            }
        },
    };
    let elapsed = started.elapsed();
    tracing::info!(outcome = outcome.as_str(), elapsed = ?elapsed, "Object processed");
    Disposition { name: object.name.clone(), kind: object.kind, outcome, action, detail, scrub, elapsed }
}

fn unlink(ctx: &Context, path: &Path) -> (Outcome, Action, String) {
    match ctx.fs.unlink(path) {
        Ok(()) => (Outcome::Success, Action::Unlinked, String::new()),
        Err(err) => {
            tracing::warn!(error = %*err, "Unlinking failed");
            (Outcome::Failed, Action::LeftInPlace, (*err).to_string())
        },
    }
}

/// Looks the object up in the archive and moves it accordingly.
fn relocate(ctx: &Context, object: &StagedObject) -> (Outcome, Action, String) {
    let existence = match lookup(&ctx.directories.archive, &object.path, ctx.compare) {
        Ok(existence) => existence,
        Err(err) => {
            tracing::warn!(error = %*err, "Archive lookup failed");
            return (Outcome::Failed, Action::LeftInPlace, (*err).to_string());
        },
    };
    match existence {
        ArchiveExistence::Present(comparison) if comparison.action == SizeAction::Graveyard => {
            tracing::info!("Archive copy is at least as large; moving to graveyard");
            let graveyard = move_to(ctx, &object.path, Role::Graveyard);
            if let Some(target) = graveyard.target {
                return (Outcome::Success, Action::Graveyarded(target), graveyard.response);
            }
            tracing::warn!(response = %graveyard.response, "Graveyard move failed; moving to trash");
            // The object is a failure whatever happens to it now.
            let trash = move_to(ctx, &object.path, Role::Trash);
            let detail = format!("{}: {}; {}: {}", graveyard.role, graveyard.response, trash.role, trash.response);
            match trash.target {
                Some(target) => (Outcome::Failed, Action::Salvaged(target), detail),
                None => {
                    tracing::warn!(response = %trash.response, "Trash move failed");
                    (Outcome::Failed, Action::LeftInPlace, detail)
                },
            }
        },
        _ => {
            tracing::info!("No smaller archive copy; moving to archive");
            let archive = move_to(ctx, &object.path, Role::Archive);
            match archive.target {
                Some(target) => (Outcome::Success, Action::Archived(target), archive.response),
                None => {
                    tracing::warn!(response = %archive.response, "Archive move failed");
                    (Outcome::Failed, Action::LeftInPlace, archive.response)
                },
            }
        },
    }
}

fn move_to(ctx: &Context, source: &Path, role: Role) -> MoveReport {
    match ctx.fs.move_into(source, ctx.directories.for_role(role)) {
        Ok(target) => MoveReport {
            role,
            result: Outcome::Success,
            response: format!("Object successfully moved to {role}"),
            target: Some(target),
        },
        Err(err) => MoveReport { role, result: Outcome::Failed, response: (*err).to_string(), target: None },
    }
}
