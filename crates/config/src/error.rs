//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// The merged configuration could not be deserialized.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// A required directory was not configured.
    #[display("directories.{_0} is not set")]
    MissingDirectory(#[error(not(source))] &'static str),
    #[display("directories.{_0} must be an absolute path, got {}", _1.display())]
    RelativeDirectory(#[error(not(source))] &'static str, #[error(not(source))] PathBuf),
    #[display("staging directory does not exist: {}", _0.display())]
    StagingMissing(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StagingMissing(_))
    }
}
