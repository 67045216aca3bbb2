//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;
use std::time::Duration;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no archive listing tool (7z, 7zz, 7za) detected on your system")]
    ToolNotFound,
    #[display("listing tool could not be started: {}", _0.display())]
    ToolUnavailable(#[error(not(source))] PathBuf),
    #[display("listing tool timed out after {}s", _0.as_secs_f32())]
    ToolTimeout(#[error(not(source))] Duration),
    /// The tool exited with a non-zero exit code (or `-1` when killed by a signal).
    #[display("listing tool exited with code {_0}: {_1}")]
    ToolFailed(#[error(not(source))] i32, #[error(not(source))] String),
    /// The staged directory could not be read while looking for an archive.
    #[display("cannot read {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ToolTimeout(_) | Self::Io(_))
    }
}
