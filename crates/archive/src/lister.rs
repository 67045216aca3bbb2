use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tracing::instrument;

/// Executable names tried, in order, when no program is configured.
const EXECUTABLES: [&str; 3] = ["7z", "7zz", "7za"];
pub const DEFAULT_ARGS: [&str; 1] = ["l"];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Produces the textual member listing of an archive.
pub trait ArchiveLister: Send + Sync {
    fn list(&self, archive: &Path) -> Result<String>;
}

/// Shared handle to an archive lister.
pub type ListerHandle = Arc<dyn ArchiveLister>;

/// Runs an external program (7-Zip by default) and returns its standard output.
///
/// The archive path is appended as the last argument. The child is killed if
/// it does not finish within the configured timeout, so a wedged tool cannot
/// stall the whole run.
#[derive(Clone, Debug)]
pub struct ExternalLister {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}
impl ExternalLister {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Looks for a 7-Zip executable in `PATH`.
    pub fn discover() -> Result<Self> {
        for exe in EXECUTABLES {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(program = %path.display(), "Discovered archive listing tool");
                return Ok(Self::new(path));
            }
        }
        tracing::info!("No 7-Zip executable found in PATH");
        exn::bail!(ErrorKind::ToolNotFound);
    }

    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, archive: &Path) -> Result<String> {
        let pending = Command::new(&self.program)
            .args(&self.args)
            .arg(archive)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();
        // Dropping the pending output on timeout kills the child.
        let Ok(output) = tokio::time::timeout(self.timeout, pending).await else {
            tracing::warn!(archive = %archive.display(), timeout = ?self.timeout, "Listing tool timed out; killed");
            exn::bail!(ErrorKind::ToolTimeout(self.timeout));
        };
        let output = output.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorKind::ToolUnavailable(self.program.clone())
            },
            _ => ErrorKind::Io(e),
        })?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            exn::bail!(ErrorKind::ToolFailed(output.status.code().unwrap_or(-1), message));
        }
        tracing::trace!(bytes = output.stdout.len(), "Captured archive listing");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ArchiveLister for ExternalLister {
    /// Blocks on the surrounding runtime when called from one of its blocking
    /// threads, otherwise on a private single-threaded runtime.
    ///
    /// Must not be called from inside an async task.
    #[instrument(skip(self), fields(program = %self.program.display()))]
    fn list(&self, archive: &Path) -> Result<String> {
        match Handle::try_current() {
            Ok(handle) => handle.block_on(self.run(archive)),
            Err(_) => {
                let runtime = Builder::new_current_thread().enable_all().build().map_err(ErrorKind::Io)?;
                runtime.block_on(self.run(archive))
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Uses `sh -c <script> sh <archive>` so the archive path becomes `$1`.
    fn shell(script: &str) -> ExternalLister {
        ExternalLister::new("sh").with_args(["-c", script, "sh"])
    }

    #[test]
    fn test_captures_stdout() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("listing.txt");
        std::fs::write(&archive, "hello listing\n").unwrap();
        let output = shell("cat \"$1\"").list(&archive).unwrap();
        assert_eq!(output, "hello listing\n");
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let err = shell("echo broken >&2; exit 3").list(Path::new("/nonexistent.rar")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolFailed(3, msg) if msg == "broken"));
    }

    #[test]
    fn test_timeout_kills_tool() {
        let lister = shell("sleep 5").with_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = lister.list(Path::new("/nonexistent.rar")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_runs_on_surrounding_runtime_from_blocking_thread() {
        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        let output = runtime
            .block_on(async { tokio::task::spawn_blocking(|| shell("printf listed").list(Path::new("/x.rar"))).await })
            .unwrap()
            .unwrap();
        assert_eq!(output, "listed");
    }

    #[test]
    fn test_missing_program() {
        let err = ExternalLister::new("/definitely/not/a/7z").list(Path::new("/x.rar")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolUnavailable(_)));
    }
}
